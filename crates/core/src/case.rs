//! Case domain types.
//!
//! A [`CaseRecord`] represents one epidemiological episode of a single
//! pathogen in a single patient. Cases are append-only: identity and anchor
//! fields are fixed at creation, only the classification and lifecycle fields
//! mutate afterwards.

use chelm_types::{CantonCode, PathogenCode, PatientId, ReportId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::ReportFact;

/// Lifecycle status of a freshly created case.
pub const CASE_STATUS_NEW: &str = "neu";

/// Epidemiological classification of a case.
///
/// Serialises to the German surveillance wire strings used by the national
/// reporting system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseClass {
    /// No classification rule matched (or none has run yet).
    #[default]
    #[serde(rename = "unclassified")]
    Unclassified,
    /// Confirmed case ("sicherer Fall"): positive laboratory interpretation.
    #[serde(rename = "sicherer Fall")]
    Confirmed,
    /// Not a case ("kein Fall"): negative laboratory interpretation.
    #[serde(rename = "kein Fall")]
    NotACase,
    /// Probable case ("wahrscheinlicher Fall"): clinical manifestation
    /// without any laboratory interpretation.
    #[serde(rename = "wahrscheinlicher Fall")]
    Probable,
}

impl std::fmt::Display for CaseClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CaseClass::Unclassified => "unclassified",
            CaseClass::Confirmed => "sicherer Fall",
            CaseClass::NotACase => "kein Fall",
            CaseClass::Probable => "wahrscheinlicher Fall",
        };
        write!(f, "{label}")
    }
}

/// Kind of a source report document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Laboratory report carrying an interpretation code.
    Lab,
    /// Clinical report carrying a manifestation text.
    Clinical,
}

/// The surveillance-relevant evidence carried by one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Lab {
        date: NaiveDate,
        interpretation: String,
    },
    Clinical {
        date: NaiveDate,
        manifestation: String,
    },
}

impl Evidence {
    /// The result date of this evidence.
    pub fn date(&self) -> NaiveDate {
        match self {
            Evidence::Lab { date, .. } | Evidence::Clinical { date, .. } => *date,
        }
    }
}

/// One tracked disease episode for one patient/pathogen pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Opaque unique identifier, assigned at creation, immutable.
    pub case_id: Uuid,
    /// Pseudonymised patient identifier, immutable after creation.
    pub patient_id: PatientId,
    /// Pathogen/organism identifier, immutable after creation.
    pub pathogen_code: PathogenCode,
    /// Human-readable pathogen description from the creating report.
    pub pathogen_description: String,
    /// Anchor date: the event date of the report that created the case.
    pub case_date: NaiveDate,
    /// Classification, recomputed by the evidence aggregator.
    pub case_class: CaseClass,
    /// Free-form lifecycle status (e.g. "neu", "active").
    pub case_status: String,
    /// Two-letter jurisdiction code; set at creation, may be corrected.
    pub canton: CantonCode,

    /// Earliest linked laboratory result date, if any.
    pub lb_date: Option<NaiveDate>,
    /// Interpretation code of the earliest laboratory result.
    pub lb_interpretation: Option<String>,
    /// Earliest linked clinical result date, if any.
    pub kb_date: Option<NaiveDate>,
    /// Manifestation text of the earliest clinical result.
    pub kb_manifestation: Option<String>,
}

impl CaseRecord {
    /// Seeds a new case from the report fact that opens it.
    ///
    /// The case starts unclassified with status [`CASE_STATUS_NEW`]; the
    /// aggregator fills in the derived fields once evidence is linked.
    pub fn opened_by(case_id: Uuid, fact: &ReportFact) -> Self {
        Self {
            case_id,
            patient_id: fact.patient_id.clone(),
            pathogen_code: fact.pathogen_code.clone(),
            pathogen_description: fact.pathogen_description.clone(),
            case_date: fact.event_date,
            case_class: CaseClass::Unclassified,
            case_status: CASE_STATUS_NEW.to_string(),
            canton: fact.canton.clone(),
            lb_date: None,
            lb_interpretation: None,
            kb_date: None,
            kb_manifestation: None,
        }
    }
}

/// Many-to-one association from a report to the case it was attributed to.
///
/// A given (report_id, case_id) pair is inserted at most once; the shape
/// allows many-to-many for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCaseLink {
    pub report_id: ReportId,
    pub case_id: Uuid,
}
