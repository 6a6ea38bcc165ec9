use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Feature and tag ids start at 1; zero is the "unconstrained" selector.
pub fn ensure_valid_id(value: i64, field: &'static str) -> Result<(), DomainError> {
    if value > 0 {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "`{field}` must be a positive id, got {value}"
        )))
    }
}
