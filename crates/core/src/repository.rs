//! Case persistence contract and the in-memory adapter.
//!
//! The [`CaseRepository`] trait is the seam towards the persistence
//! collaborator: the case table, the report↔case link table and the evidence
//! lookup, all within a transactional scope the caller controls. The shipped
//! [`InMemoryCaseRepository`] backs tests and single-process deployments;
//! database adapters implement the same trait elsewhere.

use std::collections::HashMap;
use std::sync::Mutex;

use chelm_types::{PathogenCode, PatientId, ReportId};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::case::{CaseClass, CaseRecord, Evidence, ReportCaseLink};
use crate::{CaseError, CaseResult};

/// Derived fields written back onto a case by the evidence aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationUpdate {
    pub lb_date: Option<NaiveDate>,
    pub lb_interpretation: Option<String>,
    pub kb_date: Option<NaiveDate>,
    pub kb_manifestation: Option<String>,
    pub case_class: CaseClass,
}

/// Storage contract for cases, links and evidence.
///
/// # Concurrency contract
///
/// Implementations must serialise the find-or-create step per
/// (patient_id, pathogen_code): two concurrent "no match" decisions for the
/// same scope with overlapping windows must not both create a case. The
/// in-memory adapter holds one lock across [`create_case`]'s duplicate check
/// and insert; a SQL adapter would use a unique constraint or an advisory
/// lock on the scope and map constraint violations to
/// [`CaseError::Conflict`]. On any failure the surrounding transaction rolls
/// back; no partial state (case without link, or vice versa) may become
/// visible to other readers.
///
/// [`create_case`]: CaseRepository::create_case
pub trait CaseRepository: Send + Sync {
    /// Fetches a case by id.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] if no such case exists.
    fn get_case(&self, case_id: Uuid) -> CaseResult<CaseRecord>;

    /// All cases for one patient/pathogen scope, in creation order.
    fn get_cases_by_patient_and_pathogen(
        &self,
        patient_id: &PatientId,
        pathogen_code: &PathogenCode,
    ) -> CaseResult<Vec<CaseRecord>>;

    /// Persists a new case.
    ///
    /// `window_days` is the matching window the caller used to decide "no
    /// match": if another case for the same patient and pathogen already
    /// lies within that window of the new case's anchor date, the decision
    /// is stale and the insert must fail with [`CaseError::Conflict`] so the
    /// caller can re-run the matching phase.
    fn create_case(&self, case: CaseRecord, window_days: i64) -> CaseResult<Uuid>;

    /// Whether the (report_id, case_id) link already exists.
    fn link_exists(&self, report_id: &ReportId, case_id: Uuid) -> CaseResult<bool>;

    /// Inserts the (report_id, case_id) link unless the pair already exists.
    ///
    /// Returns `true` if a row was inserted, `false` if the pair was already
    /// present. Repeated delivery of the same report must not duplicate
    /// links.
    fn insert_link(&self, report_id: &ReportId, case_id: Uuid) -> CaseResult<bool>;

    /// All report ids linked to a case, in insertion order.
    fn get_links(&self, case_id: Uuid) -> CaseResult<Vec<ReportId>>;

    /// Stores the evidence payload carried by a report.
    fn put_evidence(&self, report_id: &ReportId, evidence: Evidence) -> CaseResult<()>;

    /// Fetches the evidence payload of a report, if any was stored.
    fn get_evidence(&self, report_id: &ReportId) -> CaseResult<Option<Evidence>>;

    /// Writes the aggregator's derived fields onto a case.
    ///
    /// Never touches `case_id`, `patient_id`, `pathogen_code` or
    /// `case_date`.
    fn update_case_classification(
        &self,
        case_id: Uuid,
        update: &ClassificationUpdate,
    ) -> CaseResult<()>;

    /// Updates a case's lifecycle status.
    fn update_case_status(&self, case_id: Uuid, status: &str) -> CaseResult<()>;
}

#[derive(Debug, Default)]
struct Tables {
    cases: HashMap<Uuid, CaseRecord>,
    // Insertion order matters for link listing, so this stays a Vec.
    case_order: Vec<Uuid>,
    links: Vec<ReportCaseLink>,
    evidence: HashMap<ReportId, Evidence>,
}

/// In-memory case store.
///
/// One mutex over all tables serialises every operation, which trivially
/// satisfies the trait's concurrency contract in a single process.
#[derive(Debug, Default)]
pub struct InMemoryCaseRepository {
    inner: Mutex<Tables>,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> CaseResult<std::sync::MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|_| CaseError::Storage("case store lock poisoned".into()))
    }
}

impl CaseRepository for InMemoryCaseRepository {
    fn get_case(&self, case_id: Uuid) -> CaseResult<CaseRecord> {
        let tables = self.tables()?;
        tables
            .cases
            .get(&case_id)
            .cloned()
            .ok_or(CaseError::NotFound(case_id))
    }

    fn get_cases_by_patient_and_pathogen(
        &self,
        patient_id: &PatientId,
        pathogen_code: &PathogenCode,
    ) -> CaseResult<Vec<CaseRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .case_order
            .iter()
            .filter_map(|id| tables.cases.get(id))
            .filter(|case| {
                case.patient_id == *patient_id && case.pathogen_code == *pathogen_code
            })
            .cloned()
            .collect())
    }

    fn create_case(&self, case: CaseRecord, window_days: i64) -> CaseResult<Uuid> {
        let mut tables = self.tables()?;

        let conflicting = tables.cases.values().any(|existing| {
            existing.patient_id == case.patient_id
                && existing.pathogen_code == case.pathogen_code
                && existing
                    .case_date
                    .signed_duration_since(case.case_date)
                    .num_days()
                    .abs()
                    <= window_days
        });
        if conflicting {
            return Err(CaseError::Conflict {
                patient_id: case.patient_id.to_string(),
                pathogen_code: case.pathogen_code.to_string(),
            });
        }

        let case_id = case.case_id;
        tables.cases.insert(case_id, case);
        tables.case_order.push(case_id);
        Ok(case_id)
    }

    fn link_exists(&self, report_id: &ReportId, case_id: Uuid) -> CaseResult<bool> {
        let tables = self.tables()?;
        Ok(tables
            .links
            .iter()
            .any(|link| link.report_id == *report_id && link.case_id == case_id))
    }

    fn insert_link(&self, report_id: &ReportId, case_id: Uuid) -> CaseResult<bool> {
        let mut tables = self.tables()?;
        if !tables.cases.contains_key(&case_id) {
            return Err(CaseError::NotFound(case_id));
        }
        let exists = tables
            .links
            .iter()
            .any(|link| link.report_id == *report_id && link.case_id == case_id);
        if exists {
            return Ok(false);
        }
        tables.links.push(ReportCaseLink {
            report_id: report_id.clone(),
            case_id,
        });
        Ok(true)
    }

    fn get_links(&self, case_id: Uuid) -> CaseResult<Vec<ReportId>> {
        let tables = self.tables()?;
        Ok(tables
            .links
            .iter()
            .filter(|link| link.case_id == case_id)
            .map(|link| link.report_id.clone())
            .collect())
    }

    fn put_evidence(&self, report_id: &ReportId, evidence: Evidence) -> CaseResult<()> {
        let mut tables = self.tables()?;
        tables.evidence.insert(report_id.clone(), evidence);
        Ok(())
    }

    fn get_evidence(&self, report_id: &ReportId) -> CaseResult<Option<Evidence>> {
        let tables = self.tables()?;
        Ok(tables.evidence.get(report_id).cloned())
    }

    fn update_case_classification(
        &self,
        case_id: Uuid,
        update: &ClassificationUpdate,
    ) -> CaseResult<()> {
        let mut tables = self.tables()?;
        let case = tables
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::NotFound(case_id))?;

        case.lb_date = update.lb_date;
        case.lb_interpretation = update.lb_interpretation.clone();
        case.kb_date = update.kb_date;
        case.kb_manifestation = update.kb_manifestation.clone();
        case.case_class = update.case_class;
        Ok(())
    }

    fn update_case_status(&self, case_id: Uuid, status: &str) -> CaseResult<()> {
        let mut tables = self.tables()?;
        let case = tables
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::NotFound(case_id))?;
        case.case_status = status.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{normalise, RawReportEvent};
    use crate::ReportKind;

    fn fact(report_id: &str, patient_id: &str, date: &str) -> crate::report::ReportFact {
        normalise(RawReportEvent {
            report_id: report_id.into(),
            patient_id: patient_id.into(),
            pathogen_code: "A123".into(),
            pathogen_description: None,
            event_timestamp: date.into(),
            report_kind: ReportKind::Lab,
            lab_interpretation: None,
            clinical_manifestation: None,
            canton: "ZH".into(),
        })
        .unwrap()
    }

    fn new_case(patient_id: &str, date: &str) -> CaseRecord {
        CaseRecord::opened_by(Uuid::new_v4(), &fact("R0", patient_id, date))
    }

    #[test]
    fn test_create_and_get_case() {
        let repo = InMemoryCaseRepository::new();
        let case = new_case("P1", "2025-10-01");
        let case_id = repo.create_case(case.clone(), 28).unwrap();

        let fetched = repo.get_case(case_id).unwrap();
        assert_eq!(fetched, case);
    }

    #[test]
    fn test_get_case_not_found() {
        let repo = InMemoryCaseRepository::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            repo.get_case(missing),
            Err(CaseError::NotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_scope_query_filters_patient_and_pathogen() {
        let repo = InMemoryCaseRepository::new();
        let p1 = new_case("P1", "2025-10-01");
        let p2 = new_case("P2", "2025-10-01");
        repo.create_case(p1.clone(), 28).unwrap();
        repo.create_case(p2, 28).unwrap();

        let cases = repo
            .get_cases_by_patient_and_pathogen(&p1.patient_id, &p1.pathogen_code)
            .unwrap();
        assert_eq!(cases, vec![p1]);
    }

    #[test]
    fn test_create_case_conflicts_within_window() {
        let repo = InMemoryCaseRepository::new();
        repo.create_case(new_case("P1", "2025-10-01"), 28).unwrap();

        // Same scope, 5 days apart: a stale "no match" decision.
        let result = repo.create_case(new_case("P1", "2025-10-06"), 28);
        assert!(matches!(result, Err(CaseError::Conflict { .. })));
    }

    #[test]
    fn test_create_case_allows_distinct_episode_outside_window() {
        let repo = InMemoryCaseRepository::new();
        repo.create_case(new_case("P1", "2025-10-01"), 28).unwrap();

        let result = repo.create_case(new_case("P1", "2025-12-01"), 28);
        assert!(result.is_ok());
    }

    #[test]
    fn test_insert_link_is_idempotent() {
        let repo = InMemoryCaseRepository::new();
        let case_id = repo.create_case(new_case("P1", "2025-10-01"), 28).unwrap();
        let report_id = ReportId::new("R1").unwrap();

        assert!(repo.insert_link(&report_id, case_id).unwrap());
        assert!(!repo.insert_link(&report_id, case_id).unwrap());
        assert_eq!(repo.get_links(case_id).unwrap(), vec![report_id]);
    }

    #[test]
    fn test_insert_link_requires_existing_case() {
        let repo = InMemoryCaseRepository::new();
        let report_id = ReportId::new("R1").unwrap();
        assert!(matches!(
            repo.insert_link(&report_id, Uuid::new_v4()),
            Err(CaseError::NotFound(_))
        ));
    }

    #[test]
    fn test_link_exists() {
        let repo = InMemoryCaseRepository::new();
        let case_id = repo.create_case(new_case("P1", "2025-10-01"), 28).unwrap();
        let report_id = ReportId::new("R1").unwrap();

        assert!(!repo.link_exists(&report_id, case_id).unwrap());
        repo.insert_link(&report_id, case_id).unwrap();
        assert!(repo.link_exists(&report_id, case_id).unwrap());
    }

    #[test]
    fn test_links_listed_in_insertion_order() {
        let repo = InMemoryCaseRepository::new();
        let case_id = repo.create_case(new_case("P1", "2025-10-01"), 28).unwrap();
        for name in ["R1", "R2", "R3"] {
            repo.insert_link(&ReportId::new(name).unwrap(), case_id)
                .unwrap();
        }
        let links = repo.get_links(case_id).unwrap();
        let names: Vec<&str> = links.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["R1", "R2", "R3"]);
    }

    #[test]
    fn test_evidence_round_trip() {
        let repo = InMemoryCaseRepository::new();
        let report_id = ReportId::new("R1").unwrap();
        let evidence = Evidence::Lab {
            date: chrono::NaiveDate::from_ymd_opt(2025, 10, 2).unwrap(),
            interpretation: "Pos".into(),
        };

        assert_eq!(repo.get_evidence(&report_id).unwrap(), None);
        repo.put_evidence(&report_id, evidence.clone()).unwrap();
        assert_eq!(repo.get_evidence(&report_id).unwrap(), Some(evidence));
    }

    #[test]
    fn test_classification_update_leaves_identity_untouched() {
        let repo = InMemoryCaseRepository::new();
        let case = new_case("P1", "2025-10-01");
        let case_id = repo.create_case(case.clone(), 28).unwrap();

        let update = ClassificationUpdate {
            lb_date: chrono::NaiveDate::from_ymd_opt(2025, 10, 2),
            lb_interpretation: Some("Pos".into()),
            kb_date: None,
            kb_manifestation: None,
            case_class: CaseClass::Confirmed,
        };
        repo.update_case_classification(case_id, &update).unwrap();

        let updated = repo.get_case(case_id).unwrap();
        assert_eq!(updated.case_class, CaseClass::Confirmed);
        assert_eq!(updated.lb_interpretation.as_deref(), Some("Pos"));
        assert_eq!(updated.patient_id, case.patient_id);
        assert_eq!(updated.pathogen_code, case.pathogen_code);
        assert_eq!(updated.case_date, case.case_date);
        assert_eq!(updated.case_id, case.case_id);
    }

    #[test]
    fn test_update_status() {
        let repo = InMemoryCaseRepository::new();
        let case_id = repo.create_case(new_case("P1", "2025-10-01"), 28).unwrap();
        repo.update_case_status(case_id, "active").unwrap();
        assert_eq!(repo.get_case(case_id).unwrap().case_status, "active");
    }

    #[test]
    fn test_update_status_not_found() {
        let repo = InMemoryCaseRepository::new();
        assert!(matches!(
            repo.update_case_status(Uuid::new_v4(), "active"),
            Err(CaseError::NotFound(_))
        ));
    }
}
