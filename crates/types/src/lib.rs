//! Validated identifier types shared across the CH-ELM case service.
//!
//! Every identifier that crosses a crate boundary is wrapped in a newtype that
//! guarantees its invariant at construction time. Once constructed, the inner
//! string can be assumed valid everywhere downstream.

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating validated identifier types.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The input was empty or contained only whitespace
    #[error("identifier cannot be empty")]
    Empty,
    /// The canton code was not two ASCII letters
    #[error("canton code must be two letters, got: '{0}'")]
    InvalidCanton(String),
}

fn validated_non_empty(input: impl AsRef<str>) -> Result<String, IdError> {
    let trimmed = input.as_ref().trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty);
    }
    Ok(trimmed.to_owned())
}

macro_rules! non_empty_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from the given input.
            ///
            /// The input is trimmed of leading and trailing whitespace. If the
            /// trimmed result is empty, an error is returned.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::Empty`] if the trimmed input is empty.
            pub fn new(input: impl AsRef<str>) -> Result<Self, IdError> {
                Ok(Self(validated_non_empty(input)?))
            }

            /// Returns the inner string as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

non_empty_id!(
    /// Opaque pseudonymised patient identifier.
    ///
    /// The case service never sees raw identity data; this is the stable
    /// pseudonym handed over by the pseudonymisation service.
    PatientId
);

non_empty_id!(
    /// Pathogen/organism identifier (e.g. a SNOMED or CH-ELM observation code).
    PathogenCode
);

non_empty_id!(
    /// Identifier of a source report document (lab or clinical).
    ReportId
);

/// Two-letter Swiss canton code (e.g. "ZH", "BE").
///
/// Stored uppercased; lowercase input is accepted and normalised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CantonCode(String);

impl CantonCode {
    /// Creates a canton code from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidCanton`] unless the trimmed input is exactly
    /// two ASCII letters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdError> {
        let trimmed = input.as_ref().trim();
        if trimmed.len() != 2 || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(IdError::InvalidCanton(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the canonical uppercase code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CantonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CantonCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CantonCode {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CantonCode> for String {
    fn from(value: CantonCode) -> Self {
        value.0
    }
}
