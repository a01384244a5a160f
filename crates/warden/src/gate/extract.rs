//! Typed per-request result of the gate, readable by downstream handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};

use gatehouse_common::{Fingerprint, VerifiedBy};

/// Inserted into request extensions once the gate lets a request through
#[derive(Debug, Clone)]
pub struct VerifiedClient {
    /// Encoded value of the cookie minted for this request
    pub cookie_value: String,
    pub fingerprint: Fingerprint,
    pub verified_by: VerifiedBy,
}

impl<S> FromRequestParts<S> for VerifiedClient
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedClient>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
