use thiserror::Error;

use crate::store::MutationFailure;

/// Errors that abort a job run. Per-record data-quality faults are
/// [`RecordError`] and never convert into this type.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {message}")]
    Store {
        message: String,
        failures: Vec<MutationFailure>,
    },
}

impl JobError {
    pub fn store(message: impl Into<String>) -> Self {
        JobError::Store {
            message: message.into(),
            failures: Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;

/// Faults scoped to a single record. These are counted and logged, and the
/// run continues with the next record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("record does not parse as a JSON object: {cause}")]
    Parse { cause: String },

    #[error("field '{field}' missing or not a string")]
    FieldMissing { field: String },
}
