//! Evidence aggregation and case classification.
//!
//! Given a case, gathers the evidence of every linked report, keeps the
//! earliest laboratory and the earliest clinical result, derives the case
//! classification and writes the derived fields back onto the case row.

use chelm_types::ReportId;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::case::{CaseClass, Evidence};
use crate::repository::{CaseRepository, ClassificationUpdate};
use crate::CaseResult;

/// The derived classification of one case, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseClassification {
    pub case_id: Uuid,
    /// The reports whose evidence was considered.
    pub report_ids: Vec<ReportId>,
    pub lb_date: Option<NaiveDate>,
    pub lb_interpretation: Option<String>,
    pub kb_date: Option<NaiveDate>,
    pub kb_manifestation: Option<String>,
    pub case_class: CaseClass,
}

/// Recomputes a case's classification from all linked reports' evidence.
///
/// The earliest laboratory result and the earliest clinical result each
/// contribute their date and payload; [`classify`] turns them into the case
/// class. The derived fields are persisted onto the case; identity and anchor
/// fields are never touched. A case without any evidence keeps its defaults
/// (no dates, unclassified) — that is not an error.
///
/// # Errors
///
/// Returns [`CaseError::NotFound`] if `case_id` does not exist.
///
/// [`CaseError::NotFound`]: crate::CaseError::NotFound
pub fn collect_case_evidence(
    repo: &dyn CaseRepository,
    case_id: Uuid,
) -> CaseResult<CaseClassification> {
    // Existence check up front so a dangling case id surfaces as NotFound
    // rather than an empty aggregation.
    repo.get_case(case_id)?;

    let report_ids = repo.get_links(case_id)?;

    let mut earliest_lab: Option<(NaiveDate, String)> = None;
    let mut earliest_clinical: Option<(NaiveDate, String)> = None;

    for report_id in &report_ids {
        let Some(evidence) = repo.get_evidence(report_id)? else {
            continue;
        };
        let date = evidence.date();
        match evidence {
            Evidence::Lab { interpretation, .. } => {
                if earliest_lab.as_ref().is_none_or(|(d, _)| date < *d) {
                    earliest_lab = Some((date, interpretation));
                }
            }
            Evidence::Clinical { manifestation, .. } => {
                if earliest_clinical.as_ref().is_none_or(|(d, _)| date < *d) {
                    earliest_clinical = Some((date, manifestation));
                }
            }
        }
    }

    let (lb_date, lb_interpretation) = match earliest_lab {
        Some((date, interpretation)) => (Some(date), Some(interpretation)),
        None => (None, None),
    };
    let (kb_date, kb_manifestation) = match earliest_clinical {
        Some((date, manifestation)) => (Some(date), Some(manifestation)),
        None => (None, None),
    };

    let case_class = classify(lb_interpretation.as_deref(), kb_manifestation.as_deref());

    let update = ClassificationUpdate {
        lb_date,
        lb_interpretation: lb_interpretation.clone(),
        kb_date,
        kb_manifestation: kb_manifestation.clone(),
        case_class,
    };
    repo.update_case_classification(case_id, &update)?;

    tracing::debug!(%case_id, class = %case_class, "case classified");

    Ok(CaseClassification {
        case_id,
        report_ids,
        lb_date,
        lb_interpretation,
        kb_date,
        kb_manifestation,
        case_class,
    })
}

/// Classification rule, first match wins.
///
/// A laboratory interpretation always takes priority over clinical evidence:
/// "pos" (case-insensitive, trimmed) confirms the case, "neg" rules it out.
/// Any other laboratory value leaves the case unclassified even when a
/// clinical manifestation exists; no rule is defined upstream for that
/// combination, so it is deliberately not classified as probable.
pub fn classify(lab_interpretation: Option<&str>, manifestation: Option<&str>) -> CaseClass {
    if let Some(interpretation) = lab_interpretation {
        return match interpretation.trim().to_lowercase().as_str() {
            "pos" => CaseClass::Confirmed,
            "neg" => CaseClass::NotACase,
            _ => CaseClass::Unclassified,
        };
    }

    match manifestation {
        Some(m) if !m.trim().is_empty() => CaseClass::Probable,
        _ => CaseClass::Unclassified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseRecord;
    use crate::report::{normalise, RawReportEvent};
    use crate::repository::InMemoryCaseRepository;
    use crate::{CaseError, ReportKind};

    fn seeded_case(repo: &InMemoryCaseRepository) -> Uuid {
        let fact = normalise(RawReportEvent {
            report_id: "R0".into(),
            patient_id: "P1".into(),
            pathogen_code: "A123".into(),
            pathogen_description: None,
            event_timestamp: "2025-10-01".into(),
            report_kind: ReportKind::Lab,
            lab_interpretation: None,
            clinical_manifestation: None,
            canton: "ZH".into(),
        })
        .unwrap();
        repo.create_case(CaseRecord::opened_by(Uuid::new_v4(), &fact), 28)
            .unwrap()
    }

    fn link_lab(repo: &InMemoryCaseRepository, case_id: Uuid, id: &str, date: &str, interp: &str) {
        let report_id = ReportId::new(id).unwrap();
        repo.insert_link(&report_id, case_id).unwrap();
        repo.put_evidence(
            &report_id,
            Evidence::Lab {
                date: date.parse().unwrap(),
                interpretation: interp.into(),
            },
        )
        .unwrap();
    }

    fn link_clinical(
        repo: &InMemoryCaseRepository,
        case_id: Uuid,
        id: &str,
        date: &str,
        manifestation: &str,
    ) {
        let report_id = ReportId::new(id).unwrap();
        repo.insert_link(&report_id, case_id).unwrap();
        repo.put_evidence(
            &report_id,
            Evidence::Clinical {
                date: date.parse().unwrap(),
                manifestation: manifestation.into(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_classify_priority_lab_pos_wins_over_manifestation() {
        assert_eq!(
            classify(Some("POS"), Some("Urethritis")),
            CaseClass::Confirmed
        );
    }

    #[test]
    fn test_classify_priority_lab_neg_wins_over_manifestation() {
        assert_eq!(
            classify(Some("Neg"), Some("Urethritis")),
            CaseClass::NotACase
        );
    }

    #[test]
    fn test_classify_other_lab_value_stays_unclassified() {
        // Known gap: clinical evidence is ignored when the lab value is
        // neither pos nor neg.
        assert_eq!(
            classify(Some("inconclusive"), Some("Urethritis")),
            CaseClass::Unclassified
        );
    }

    #[test]
    fn test_classify_manifestation_without_lab_is_probable() {
        assert_eq!(classify(None, Some("Urethritis")), CaseClass::Probable);
    }

    #[test]
    fn test_classify_blank_manifestation_is_unclassified() {
        assert_eq!(classify(None, Some("   ")), CaseClass::Unclassified);
        assert_eq!(classify(None, None), CaseClass::Unclassified);
    }

    #[test]
    fn test_classify_trims_and_ignores_case() {
        assert_eq!(classify(Some("  pos "), None), CaseClass::Confirmed);
        assert_eq!(classify(Some("NEG"), None), CaseClass::NotACase);
    }

    #[test]
    fn test_aggregation_picks_earliest_of_each_kind() {
        let repo = InMemoryCaseRepository::new();
        let case_id = seeded_case(&repo);
        link_lab(&repo, case_id, "L2", "2025-10-05", "Neg");
        link_lab(&repo, case_id, "L1", "2025-10-02", "Pos");
        link_clinical(&repo, case_id, "K1", "2025-10-01", "Urethritis");

        let result = collect_case_evidence(&repo, case_id).unwrap();

        assert_eq!(result.lb_date, "2025-10-02".parse().ok());
        assert_eq!(result.lb_interpretation.as_deref(), Some("Pos"));
        assert_eq!(result.kb_date, "2025-10-01".parse().ok());
        assert_eq!(result.kb_manifestation.as_deref(), Some("Urethritis"));
        assert_eq!(result.case_class, CaseClass::Confirmed);
    }

    #[test]
    fn test_aggregation_persists_derived_fields() {
        let repo = InMemoryCaseRepository::new();
        let case_id = seeded_case(&repo);
        link_lab(&repo, case_id, "L1", "2025-10-02", "Pos");

        collect_case_evidence(&repo, case_id).unwrap();

        let case = repo.get_case(case_id).unwrap();
        assert_eq!(case.case_class, CaseClass::Confirmed);
        assert_eq!(case.lb_date, "2025-10-02".parse().ok());
        assert_eq!(case.lb_interpretation.as_deref(), Some("Pos"));
        assert_eq!(case.kb_date, None);
    }

    #[test]
    fn test_aggregation_without_evidence_keeps_defaults() {
        let repo = InMemoryCaseRepository::new();
        let case_id = seeded_case(&repo);

        let result = collect_case_evidence(&repo, case_id).unwrap();

        assert_eq!(result.case_class, CaseClass::Unclassified);
        assert_eq!(result.lb_date, None);
        assert_eq!(result.kb_date, None);
        assert!(result.report_ids.is_empty());
    }

    #[test]
    fn test_aggregation_clinical_only_is_probable() {
        let repo = InMemoryCaseRepository::new();
        let case_id = seeded_case(&repo);
        link_clinical(&repo, case_id, "K1", "2025-10-03", "Urethritis");

        let result = collect_case_evidence(&repo, case_id).unwrap();
        assert_eq!(result.case_class, CaseClass::Probable);
        assert_eq!(result.kb_date, "2025-10-03".parse().ok());
    }

    #[test]
    fn test_aggregation_missing_case_is_not_found() {
        let repo = InMemoryCaseRepository::new();
        assert!(matches!(
            collect_case_evidence(&repo, Uuid::new_v4()),
            Err(CaseError::NotFound(_))
        ));
    }
}
