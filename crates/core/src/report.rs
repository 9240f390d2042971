//! Report normalisation.
//!
//! Converts the raw event shape delivered by the upstream source (the FHIR
//! transformer / event consumer, outside this crate) into the canonical
//! [`ReportFact`] consumed by the matcher. The core never inspects raw nested
//! FHIR maps; upstream extraction has already happened.

use chelm_types::{CantonCode, PathogenCode, PatientId, ReportId};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::case::{Evidence, ReportKind};
use crate::{CaseError, CaseResult};

/// Raw fields of one incoming report event, as delivered upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReportEvent {
    pub report_id: String,
    pub patient_id: String,
    pub pathogen_code: String,
    #[serde(default)]
    pub pathogen_description: Option<String>,
    /// ISO-8601 timestamp or plain `YYYY-MM-DD` date.
    pub event_timestamp: String,
    pub report_kind: ReportKind,
    /// Laboratory interpretation code, for lab reports.
    #[serde(default)]
    pub lab_interpretation: Option<String>,
    /// Clinical manifestation text, for clinical reports.
    #[serde(default)]
    pub clinical_manifestation: Option<String>,
    pub canton: String,
}

/// The normalised shape a report is reduced to before matching.
///
/// Ephemeral: never persisted as its own entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFact {
    pub report_id: ReportId,
    pub patient_id: PatientId,
    pub pathogen_code: PathogenCode,
    pub pathogen_description: String,
    /// Calendar date of the reported event; time-of-day is discarded.
    pub event_date: NaiveDate,
    pub canton: CantonCode,
    /// The report's evidence payload, when the relevant field was present.
    pub evidence: Option<Evidence>,
}

/// Validates and coerces a raw event into a [`ReportFact`].
///
/// Case-window arithmetic works on whole calendar days, so any time-of-day
/// in `event_timestamp` is truncated here and never reaches the matcher.
///
/// # Errors
///
/// Returns `CaseError::Validation` when `patient_id`, `pathogen_code` or
/// `report_id` is missing/empty, when the canton code is malformed, or when
/// the timestamp parses as neither RFC 3339 nor `YYYY-MM-DD`.
pub fn normalise(raw: RawReportEvent) -> CaseResult<ReportFact> {
    let report_id = ReportId::new(&raw.report_id)
        .map_err(|e| CaseError::Validation(format!("report_id: {e}")))?;
    let patient_id = PatientId::new(&raw.patient_id)
        .map_err(|e| CaseError::Validation(format!("patient_id: {e}")))?;
    let pathogen_code = PathogenCode::new(&raw.pathogen_code)
        .map_err(|e| CaseError::Validation(format!("pathogen_code: {e}")))?;
    let canton =
        CantonCode::new(&raw.canton).map_err(|e| CaseError::Validation(e.to_string()))?;

    let event_date = parse_event_date(&raw.event_timestamp)?;

    let evidence = match raw.report_kind {
        ReportKind::Lab => raw.lab_interpretation.map(|interpretation| Evidence::Lab {
            date: event_date,
            interpretation,
        }),
        ReportKind::Clinical => {
            raw.clinical_manifestation
                .map(|manifestation| Evidence::Clinical {
                    date: event_date,
                    manifestation,
                })
        }
    };

    Ok(ReportFact {
        report_id,
        patient_id,
        pathogen_code,
        pathogen_description: raw.pathogen_description.unwrap_or_default(),
        event_date,
        canton,
        evidence,
    })
}

fn parse_event_date(input: &str) -> CaseResult<NaiveDate> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }

    Err(CaseError::Validation(format!(
        "unparseable event timestamp: '{input}'"
    )))
}
