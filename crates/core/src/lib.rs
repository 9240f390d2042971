//! # CH-ELM Core
//!
//! Core case-consolidation logic for the Swiss disease surveillance service.
//!
//! Incoming lab/clinical report events are normalised, attributed to an
//! existing disease episode ("case") or a new one via a ±N-day matching
//! window with nearest-date tie-breaking, linked idempotently in the
//! report↔case table and classified from their accumulated evidence.
//!
//! **No API concerns**: HTTP servers, FHIR parsing and pub/sub transports
//! belong to the entrypoint crates; this crate only consumes the
//! already-extracted event shape.

pub mod aggregator;
pub mod case;
pub mod config;
pub mod error;
pub mod events;
pub mod matcher;
pub mod report;
pub mod repository;
pub mod service;

pub use case::{CaseClass, CaseRecord, Evidence, ReportCaseLink, ReportKind, CASE_STATUS_NEW};
pub use config::{CoreConfig, DEFAULT_CASE_DURATION_DAYS};
pub use error::{CaseError, CaseResult};
pub use events::{CaseNotifier, DomainEvent, NotifyError, Outbox, TracingNotifier};
pub use matcher::MatchOutcome;
pub use report::{RawReportEvent, ReportFact};
pub use repository::{CaseRepository, ClassificationUpdate, InMemoryCaseRepository};
pub use service::{CaseService, ProcessedReport};
