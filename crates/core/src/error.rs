/// Error taxonomy for case processing.
///
/// `Validation` rejects a single malformed event and is never retried.
/// `Conflict` signals a detected race on case creation; the orchestrator
/// retries the whole match/create step, since the conflicting writer may have
/// just created the case that should now be matched.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("invalid report event: {0}")]
    Validation(String),
    #[error("case not found: {0}")]
    NotFound(uuid::Uuid),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("concurrent case creation for patient '{patient_id}' and pathogen '{pathogen_code}'")]
    Conflict {
        patient_id: String,
        pathogen_code: String,
    },
}

pub type CaseResult<T> = std::result::Result<T, CaseError>;
