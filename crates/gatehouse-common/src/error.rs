//! Common error types for Gatehouse components.

use thiserror::Error;

/// Common errors across Gatehouse components
#[derive(Debug, Error)]
pub enum GatehouseError {
    /// Verification cookie could not be opened
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Verification cookie could not be sealed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// External verifier rejected the challenge
    #[error("Verification denied: {0}")]
    VerificationDenied(String),

    /// External verifier could not be reached or answered garbage
    #[error("Verification unavailable: {0}")]
    VerificationUnavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatehouseError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // Callers recover from this one by treating the client as unverified
            Self::Decoding(_) => 401,
            Self::Encoding(_) => 500,
            Self::VerificationDenied(_) => 403,
            Self::VerificationUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VerificationUnavailable(_))
    }
}
