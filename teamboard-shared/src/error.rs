/// Error types shared by every Teamboard component
///
/// All core operations return [`CoreResult<T>`]. The error taxonomy is closed:
///
/// - **NotFound**: the resource chain could not be resolved *or* the caller has no
///   visibility into it. Both cases produce the same error so callers cannot test
///   for the existence of teams, projects or issues they don't belong to.
/// - **Forbidden**: the resource is visible but the action is role-restricted.
/// - **Validation**: limit exceeded, input too short, mismatched confirmation.
/// - **RateLimited**: the AI quota for the caller is exhausted.
/// - **Service**: a downstream collaborator (AI provider, delivery) failed.
///
/// Persistence failures are carried as [`CoreError::Storage`]; they sit outside the
/// taxonomy and should be treated as internal errors by the routing layer.
///
/// # Example
///
/// ```
/// use teamboard_shared::error::{CoreError, ErrorKind};
///
/// let err = CoreError::not_found("Project not found");
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.to_string(), "Not found: Project not found");
/// ```

use std::fmt;

/// Result alias used throughout the core
pub type CoreResult<T> = Result<T, CoreError>;

/// Result alias for persistence collaborators
pub type StoreResult<T> = Result<T, StoreError>;

/// Unified core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Resource absent or not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource visible, action not permitted for the caller's role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Input or limit violation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// AI call quota exhausted
    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Downstream service failure (never retried)
    #[error("Service error: {0}")]
    Service(String),

    /// Persistence collaborator failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Discriminant of [`CoreError`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Validation,
    RateLimited,
    Service,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Validation => "validation_error",
            ErrorKind::RateLimited => "rate_limit_exceeded",
            ErrorKind::Service => "service_error",
            ErrorKind::Storage => "internal_error",
        };
        write!(f, "{}", name)
    }
}

impl CoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CoreError::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        CoreError::Service(msg.into())
    }

    /// Returns the error discriminant
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::RateLimited { .. } => ErrorKind::RateLimited,
            CoreError::Service(_) => ErrorKind::Service,
            CoreError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Convert derive-based input validation failures into the core taxonomy
impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect();
        fields.sort();

        CoreError::Validation(fields.join("; "))
    }
}

/// Errors raised by persistence collaborators
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Uniqueness or referential constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store temporarily unable to serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct NameInput {
        #[validate(length(min = 1, max = 5))]
        name: String,
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::forbidden("Only team owner can perform this action");
        assert_eq!(
            err.to_string(),
            "Forbidden: Only team owner can perform this action"
        );

        let err = CoreError::RateLimited { retry_after_secs: 12 };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Try again in 12 seconds"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(CoreError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(CoreError::service("x").kind(), ErrorKind::Service);
        assert_eq!(
            CoreError::from(StoreError::Conflict("dup".into())).kind(),
            ErrorKind::Storage
        );
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limit_exceeded");
    }

    #[test]
    fn test_validation_errors_convert() {
        let input = NameInput {
            name: "much too long".to_string(),
        };
        let err: CoreError = input.validate().unwrap_err().into();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("name"));
    }
}
