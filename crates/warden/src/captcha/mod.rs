//! Challenge verification against the external reCAPTCHA service.
//!
//! The gate only needs a yes/no answer for a (token, client address) pair,
//! so the service sits behind the [`ChallengeVerifier`] trait.

mod verifier;

pub use verifier::RecaptchaVerifier;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use gatehouse_common::{GatehouseError, VerificationOutcome};

/// Failure to obtain an answer from the verifier. A denial is not an error.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verifier request failed: {0}")]
    Transport(String),

    #[error("verifier did not answer within {0:?}")]
    Timeout(Duration),

    #[error("verifier returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl From<VerifyError> for GatehouseError {
    fn from(err: VerifyError) -> Self {
        GatehouseError::VerificationUnavailable(err.to_string())
    }
}

/// External challenge verification service
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// Check a challenge response token submitted by the client at `remote_ip`
    async fn verify(
        &self,
        token: &str,
        remote_ip: &str,
    ) -> Result<VerificationOutcome, VerifyError>;
}
