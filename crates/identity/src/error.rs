//! Error types for Dactylos identity operations.
//!
//! Collaborator errors (`ProviderError`, `VerifierError`, `StoreError`) are
//! produced by the injected capability provider, verifier and key-value
//! store. `SessionError` is what the session driver reports back to the
//! presentation layer; every variant is recoverable by re-issuing the
//! triggering event.

use thiserror::Error;

/// Failure while querying biometric capabilities.
///
/// Never surfaced to the user: the prober folds it into "unsupported".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Capability query failed: {0}")]
pub struct ProviderError(pub String);

/// Hardware or runtime failure raised by the platform verifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Verifier error: {0}")]
pub struct VerifierError(pub String);

/// Key-value store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Reading a key failed
    #[error("Store read failed: {0}")]
    Read(String),

    /// Writing a key failed
    #[error("Store write failed: {0}")]
    Write(String),

    /// Deleting a key failed
    #[error("Store delete failed: {0}")]
    Delete(String),

    /// Backend could not be opened or initialized
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Display name rejected by the binding flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Name is empty or whitespace-only
    #[error("Display name must not be empty")]
    EmptyName,
}

/// Errors reported by the session driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Device has no usable biometric capability
    #[error("Biometric authentication is not supported on this device")]
    Unsupported,

    /// Biometric did not match, or the user cancelled
    #[error("Biometric verification rejected: {0}")]
    Rejected(String),

    /// Verifier hardware/runtime failure
    #[error("Biometric verification failed: {0}")]
    VerificationFailed(String),

    /// Submitted display name is invalid
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Store read/write/delete failed; state was not advanced
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// Event is not accepted in the current state
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// The task driving the event was torn down with the runtime
    #[error("Session event interrupted: {0}")]
    Interrupted(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_reason() {
        let errors = vec![
            SessionError::Rejected("user_cancel".to_string()),
            SessionError::VerificationFailed("not_available".to_string()),
            SessionError::Persistence(StoreError::Write("disk full".to_string())),
        ];

        assert!(errors[0].to_string().contains("user_cancel"));
        assert!(errors[1].to_string().contains("not_available"));
        assert!(errors[2].to_string().contains("disk full"));
    }

    #[test]
    fn test_conversions() {
        let err: SessionError = ValidationError::EmptyName.into();
        assert_eq!(err, SessionError::Validation(ValidationError::EmptyName));

        let err: SessionError = StoreError::Read("io".to_string()).into();
        assert!(matches!(err, SessionError::Persistence(StoreError::Read(_))));
    }
}
