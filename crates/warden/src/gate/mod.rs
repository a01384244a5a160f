//! Gate decision: let a request through on a matching fingerprint cookie,
//! otherwise require a successful challenge verification.

mod extract;
mod middleware;

pub use extract::VerifiedClient;
pub use middleware::require_verification;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_cookies::Cookies;

use gatehouse_common::{Fingerprint, GatehouseError, VerifiedBy};

use crate::captcha::{ChallengeVerifier, VerifyError};
use crate::cookie::{CodecError, CookieCodec, CookieRecord};

/// Why a request did not make it through the gate
#[derive(Debug, Error)]
pub enum GateError {
    #[error("challenge verification denied")]
    Denied,

    #[error(transparent)]
    Unavailable(#[from] VerifyError),

    #[error("failed to mint verification cookie: {0}")]
    Mint(CodecError),
}

impl From<GateError> for GatehouseError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Denied => {
                GatehouseError::VerificationDenied("challenge verification denied".to_string())
            }
            GateError::Unavailable(e) => e.into(),
            GateError::Mint(e) => GatehouseError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let err = GatehouseError::from(self);
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, status.canonical_reason().unwrap_or("Error")).into_response()
    }
}

/// Failure to read a usable fingerprint out of the request's cookie
#[derive(Debug, Error)]
pub enum CookieReadError {
    #[error("verification cookie not present")]
    Missing,

    #[error(transparent)]
    Invalid(#[from] CodecError),
}

/// A request that passed the gate, with the cookie to hand back
#[derive(Debug, Clone)]
pub struct Admission {
    pub verified_by: VerifiedBy,
    pub fingerprint: Fingerprint,
    pub cookie: CookieRecord,
}

/// Gate state shared by every request; immutable after startup
pub struct Gate {
    codec: CookieCodec,
    verifier: Arc<dyn ChallengeVerifier>,
    verify_timeout: Duration,
}

impl Gate {
    pub fn new(
        codec: CookieCodec,
        verifier: Arc<dyn ChallengeVerifier>,
        verify_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            verifier,
            verify_timeout,
        }
    }

    /// Name of the verification cookie
    pub fn cookie_name(&self) -> &str {
        self.codec.name()
    }

    /// Whether a cookie with the configured name is present at all.
    ///
    /// Existence only; the value is not opened. Presentation code uses this to
    /// decide whether to render the challenge widget.
    pub fn has_verification_cookie(&self, cookies: &Cookies) -> bool {
        cookies.get(self.cookie_name()).is_some()
    }

    /// Open the presented cookie value
    pub fn read_cookie(&self, presented: Option<&str>) -> Result<Fingerprint, CookieReadError> {
        let value = presented.ok_or(CookieReadError::Missing)?;
        Ok(self.codec.open(value)?)
    }

    /// True when the presented cookie opens and was sealed for this fingerprint
    pub fn validate_cookie(&self, presented: Option<&str>, current: &Fingerprint) -> bool {
        match self.read_cookie(presented) {
            Ok(sealed) if sealed == *current => true,
            Ok(sealed) => {
                tracing::debug!(
                    sealed = %sealed.redacted(),
                    current = %current.redacted(),
                    "Verification cookie bound to a different client"
                );
                false
            }
            Err(CookieReadError::Missing) => false,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding unusable verification cookie");
                false
            }
        }
    }

    /// Run the gate for one request.
    ///
    /// On success a new cookie is always minted for `fingerprint`, whichever
    /// path verified the client.
    pub async fn admit(
        &self,
        presented: Option<&str>,
        fingerprint: Fingerprint,
        challenge: Option<&str>,
        client_ip: &str,
    ) -> Result<Admission, GateError> {
        let verified_by = if self.validate_cookie(presented, &fingerprint) {
            VerifiedBy::Cookie
        } else {
            self.verify_challenge(challenge, client_ip).await?;
            VerifiedBy::Challenge
        };

        let cookie = self.codec.seal(&fingerprint).map_err(GateError::Mint)?;

        Ok(Admission {
            verified_by,
            fingerprint,
            cookie,
        })
    }

    async fn verify_challenge(
        &self,
        challenge: Option<&str>,
        client_ip: &str,
    ) -> Result<(), GateError> {
        let Some(token) = challenge.filter(|t| !t.is_empty()) else {
            tracing::debug!(client_ip = %client_ip, "No challenge token presented");
            return Err(GateError::Denied);
        };

        let outcome = tokio::time::timeout(
            self.verify_timeout,
            self.verifier.verify(token, client_ip),
        )
        .await
        .map_err(|_| VerifyError::Timeout(self.verify_timeout))??;

        if outcome.is_success() {
            Ok(())
        } else {
            Err(GateError::Denied)
        }
    }
}
