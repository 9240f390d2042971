//! # CH-ELM Pseudonymisation
//!
//! Stable pseudonyms for patient identity.
//!
//! The case service must never see raw identity data. This crate maps a Swiss
//! AHV number (the national insurance number carried by incoming reports) to
//! an opaque, stable UUID: the same AHV always resolves to the same pseudonym,
//! and a previously unseen AHV mints a fresh one.
//!
//! **No storage concerns**: the directory behind the mapping is a trait;
//! callers decide whether it is backed by memory, a database, or a remote
//! service.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use uuid::Uuid;

/// Errors that can occur during pseudonymisation.
#[derive(Debug, thiserror::Error)]
pub enum PseudonymError {
    /// The input did not normalise to a valid AHV number
    #[error("invalid AHV number: '{0}'")]
    InvalidAhv(String),
    /// The backing directory failed
    #[error("patient directory failure: {0}")]
    Directory(String),
}

pub type PseudonymResult<T> = std::result::Result<T, PseudonymError>;

/// A normalised Swiss AHV number (13 digits, separators stripped).
///
/// Construction strips every non-digit character, so the common formatted
/// form `756.1234.5678.97` and the bare form `7561234567897` normalise to the
/// same value. Anything that does not reduce to exactly 13 digits is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AhvNumber(String);

impl AhvNumber {
    const DIGITS: usize = 13;

    /// Normalises and validates an AHV number.
    ///
    /// # Errors
    ///
    /// Returns [`PseudonymError::InvalidAhv`] if the input does not contain
    /// exactly 13 digits after stripping separators.
    pub fn new(input: impl AsRef<str>) -> PseudonymResult<Self> {
        let digits: String = input.as_ref().chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != Self::DIGITS {
            return Err(PseudonymError::InvalidAhv(input.as_ref().to_owned()));
        }
        Ok(Self(digits))
    }

    /// Returns the digits-only form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AhvNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AhvNumber {
    type Err = PseudonymError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AhvNumber::new(s)
    }
}

/// Outcome of resolving an AHV number to a pseudonym.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// The stable pseudonym for this patient.
    pub patient_id: Uuid,
    /// True if this call minted a new pseudonym.
    pub created: bool,
}

/// Directory mapping AHV numbers to stable patient pseudonyms.
///
/// Implementations must be get-or-create: resolving a known AHV returns the
/// existing pseudonym unchanged, resolving an unknown one allocates a fresh
/// UUID exactly once. Concurrent resolves of the same AHV must not mint two
/// pseudonyms.
pub trait PatientDirectory: Send + Sync {
    /// Resolves an AHV number to its stable pseudonym, minting one if needed.
    fn resolve(&self, ahv: &AhvNumber) -> PseudonymResult<Resolved>;
}

/// In-memory patient directory.
///
/// Suitable for tests and single-process deployments; one lock over the map
/// gives the get-or-create atomicity the trait requires.
#[derive(Debug, Default)]
pub struct InMemoryPatientDirectory {
    entries: Mutex<HashMap<AhvNumber, Uuid>>,
}

impl InMemoryPatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatientDirectory for InMemoryPatientDirectory {
    fn resolve(&self, ahv: &AhvNumber) -> PseudonymResult<Resolved> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PseudonymError::Directory("patient directory lock poisoned".into()))?;

        if let Some(existing) = entries.get(ahv) {
            return Ok(Resolved {
                patient_id: *existing,
                created: false,
            });
        }

        let patient_id = Uuid::new_v4();
        entries.insert(ahv.clone(), patient_id);
        tracing::info!(%patient_id, "minted new patient pseudonym");

        Ok(Resolved {
            patient_id,
            created: true,
        })
    }
}
