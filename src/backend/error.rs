use thiserror::Error;

/// Provider-side failure of a single generation attempt. There is no retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("backend call failed (request_id={request_id}, model={model}): {cause}")]
pub struct BackendError {
    pub request_id: String,
    pub model: String,
    pub cause: String,
}

impl BackendError {
    pub fn new(
        request_id: impl Into<String>,
        model: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            model: model.into(),
            cause: cause.to_string(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
