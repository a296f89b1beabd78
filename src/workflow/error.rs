use thiserror::Error;

/// Failure modes of the business rules, independent of HTTP and storage.
/// The web layer maps each variant onto a status code and public error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The request payload itself is malformed or out of range.
    #[error("validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The payload is fine but the world is not in a state that allows the
    /// operation yet (e.g. approving a booking that has no approved payment).
    #[error("{0}")]
    Precondition(String),

    /// The entity has already left the state the operation requires.
    #[error("{0}")]
    InvalidState(String),

    /// The operation collides with an existing record.
    #[error("{0}")]
    Conflict(String),

    /// The actor is not allowed to perform this operation.
    #[error("not authorized")]
    Unauthorized,
}

impl WorkflowError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        WorkflowError::Validation {
            field,
            message: message.into(),
        }
    }
}
