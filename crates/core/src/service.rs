//! Case service orchestration.
//!
//! Coordinates normaliser → matcher → store → aggregator for each incoming
//! report event and exposes the query surface consumed by the thin REST
//! entrypoint. Each event runs `received → normalised → matched|created →
//! linked → classified → done`, aborting the whole sequence on the first
//! failing step.

use std::sync::Arc;

use chelm_types::{PathogenCode, PatientId, ReportId};
use uuid::Uuid;

use crate::aggregator::{self, CaseClassification};
use crate::case::CaseRecord;
use crate::config::CoreConfig;
use crate::events::{CaseNotifier, DomainEvent, Outbox};
use crate::matcher::{self, MatchOutcome};
use crate::report::{self, RawReportEvent, ReportFact};
use crate::repository::CaseRepository;
use crate::{CaseError, CaseResult};

/// One retry after a creation conflict: the conflicting writer may have just
/// created the case this report should now match.
const MAX_RESOLVE_ATTEMPTS: u32 = 2;

/// Result of processing one report event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedReport {
    pub case_id: Uuid,
    /// True if this event created the case, false if it joined an existing
    /// one.
    pub created: bool,
    pub classification: CaseClassification,
}

/// Orchestrates case consolidation per incoming report event.
///
/// Constructed once per process and injected into the entrypoints; holds no
/// per-event state.
#[derive(Clone)]
pub struct CaseService {
    cfg: Arc<CoreConfig>,
    repo: Arc<dyn CaseRepository>,
    notifier: Arc<dyn CaseNotifier>,
}

impl CaseService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        repo: Arc<dyn CaseRepository>,
        notifier: Arc<dyn CaseNotifier>,
    ) -> Self {
        Self {
            cfg,
            repo,
            notifier,
        }
    }

    /// Processes one incoming report event end to end.
    ///
    /// Normalises the raw event, attributes it to an existing case within
    /// the matching window or creates a new one, links the report
    /// idempotently, stores its evidence and recomputes the case
    /// classification. Emits `CaseCreated`/`CaseUpdated` after the store
    /// operations; notification failure does not fail the event.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed event, `Storage`/`NotFound` from the
    /// persistence layer, `Conflict` only if a creation race persists after
    /// the internal retry.
    pub fn process_report(&self, raw: RawReportEvent) -> CaseResult<ProcessedReport> {
        let fact = report::normalise(raw)?;
        tracing::info!(
            namespace = self.cfg.namespace(),
            report_id = %fact.report_id,
            patient_id = %fact.patient_id,
            pathogen_code = %fact.pathogen_code,
            event_date = %fact.event_date,
            "processing report event"
        );

        let (case_id, created) = self.resolve_or_create(&fact)?;

        let inserted = self.repo.insert_link(&fact.report_id, case_id)?;
        if !inserted {
            tracing::debug!(report_id = %fact.report_id, %case_id, "link already present");
        }
        if let Some(evidence) = fact.evidence.clone() {
            self.repo.put_evidence(&fact.report_id, evidence)?;
        }

        let classification = aggregator::collect_case_evidence(self.repo.as_ref(), case_id)?;

        let case = self.repo.get_case(case_id)?;
        let mut outbox = Outbox::new();
        outbox.record(if created {
            DomainEvent::CaseCreated {
                case_id,
                case_class: case.case_class,
                case_status: case.case_status.clone(),
            }
        } else {
            DomainEvent::CaseUpdated {
                case_id,
                case_class: case.case_class,
                case_status: case.case_status.clone(),
            }
        });
        self.dispatch(&mut outbox);

        tracing::info!(%case_id, created, class = %case.case_class, "report processed");

        Ok(ProcessedReport {
            case_id,
            created,
            classification,
        })
    }

    /// Finds the case this fact belongs to, creating one on a window miss.
    ///
    /// A `Conflict` from the store means another writer created a case for
    /// the same scope between our read and our insert; the candidates are
    /// re-read and matching re-runs, which then attributes the report to the
    /// freshly created case.
    fn resolve_or_create(&self, fact: &ReportFact) -> CaseResult<(Uuid, bool)> {
        let window_days = self.cfg.case_duration_days();

        for attempt in 1..=MAX_RESOLVE_ATTEMPTS {
            let candidates = self
                .repo
                .get_cases_by_patient_and_pathogen(&fact.patient_id, &fact.pathogen_code)?;

            match matcher::find_matching_case(fact, &candidates, window_days) {
                MatchOutcome::Matched(case_id) => {
                    tracing::debug!(%case_id, "matched existing case");
                    return Ok((case_id, false));
                }
                MatchOutcome::NoMatch => {
                    let case = CaseRecord::opened_by(Uuid::new_v4(), fact);
                    match self.repo.create_case(case, window_days) {
                        Ok(case_id) => return Ok((case_id, true)),
                        Err(CaseError::Conflict { .. }) if attempt < MAX_RESOLVE_ATTEMPTS => {
                            tracing::info!(
                                patient_id = %fact.patient_id,
                                pathogen_code = %fact.pathogen_code,
                                "case creation conflict, re-running match"
                            );
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // Unreachable: the loop either returns or retries, and the last
        // attempt returns the conflict error itself.
        Err(CaseError::Storage("resolve_or_create exhausted".into()))
    }

    fn dispatch(&self, outbox: &mut Outbox) {
        for event in outbox.drain() {
            if let Err(e) = self.notifier.publish(&event) {
                // Best-effort: the commit stands even if nobody hears of it.
                tracing::warn!(case_id = %event.case_id(), error = %e, "event publish failed");
            }
        }
    }

    /// Fetches one case by id.
    pub fn get_case(&self, case_id: Uuid) -> CaseResult<CaseRecord> {
        self.repo.get_case(case_id)
    }

    /// All cases for one patient/pathogen scope.
    pub fn get_cases_by_patient_and_pathogen(
        &self,
        patient_id: &PatientId,
        pathogen_code: &PathogenCode,
    ) -> CaseResult<Vec<CaseRecord>> {
        self.repo
            .get_cases_by_patient_and_pathogen(patient_id, pathogen_code)
    }

    /// The report ids linked to a case.
    pub fn get_case_reports(&self, case_id: Uuid) -> CaseResult<Vec<ReportId>> {
        self.repo.get_case(case_id)?;
        self.repo.get_links(case_id)
    }

    /// Updates a case's lifecycle status and emits `CaseUpdated`.
    pub fn update_case_status(&self, case_id: Uuid, status: &str) -> CaseResult<CaseRecord> {
        self.repo.update_case_status(case_id, status)?;
        let case = self.repo.get_case(case_id)?;

        let mut outbox = Outbox::new();
        outbox.record(DomainEvent::CaseUpdated {
            case_id,
            case_class: case.case_class,
            case_status: case.case_status.clone(),
        });
        self.dispatch(&mut outbox);

        Ok(case)
    }
}
