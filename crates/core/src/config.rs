//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the
//! service. Nothing in the core reads process-wide environment variables
//! during event handling; the binaries own that translation.

use crate::{CaseError, CaseResult};

/// Clinically assumed duration of one disease episode, in days.
///
/// A report is attributed to an existing case when its event date lies within
/// this many days of the case anchor date (in either direction).
pub const DEFAULT_CASE_DURATION_DAYS: i64 = 28;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    case_duration_days: i64,
    namespace: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CaseError::Validation` if `case_duration_days` is not
    /// positive or `namespace` is empty.
    pub fn new(case_duration_days: i64, namespace: String) -> CaseResult<Self> {
        if case_duration_days <= 0 {
            return Err(CaseError::Validation(
                "case_duration_days must be positive".into(),
            ));
        }
        if namespace.trim().is_empty() {
            return Err(CaseError::Validation("namespace cannot be empty".into()));
        }

        Ok(Self {
            case_duration_days,
            namespace,
        })
    }

    /// The ±N-day matching window around a case anchor date.
    pub fn case_duration_days(&self) -> i64 {
        self.case_duration_days
    }

    /// Deployment namespace, carried in outbound notifications and logs.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            case_duration_days: DEFAULT_CASE_DURATION_DAYS,
            namespace: "chelm.dev.1".into(),
        }
    }
}
