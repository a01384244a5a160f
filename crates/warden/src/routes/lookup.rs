//! Handlers behind the gate.

use axum::{Json, extract::Path, http::StatusCode};
use serde::Serialize;
use std::net::IpAddr;

use gatehouse_common::VerifiedBy;

use crate::gate::VerifiedClient;

#[derive(Serialize)]
pub struct IndexResponse {
    status: &'static str,
    verified_by: VerifiedBy,
    /// Shortened client fingerprint the cookie is bound to
    fingerprint: String,
    /// Encoded cookie minted for this request
    recaptcha: String,
}

/// Landing endpoint for verified clients
pub async fn index(verified: VerifiedClient) -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "verified",
        verified_by: verified.verified_by,
        fingerprint: verified.fingerprint.redacted(),
        recaptcha: verified.cookie_value,
    })
}

#[derive(Serialize)]
pub struct LookupResponse {
    name: String,
    a: Vec<IpAddr>,
    aaaa: Vec<IpAddr>,
}

/// Resolve a hostname's address records
pub async fn lookup(
    _verified: VerifiedClient,
    Path(name): Path<String>,
) -> Result<Json<LookupResponse>, StatusCode> {
    if !is_hostname(&name) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let addrs = tokio::net::lookup_host((name.as_str(), 0))
        .await
        .map_err(|e| {
            tracing::debug!(name = %name, error = %e, "Lookup failed");
            StatusCode::NOT_FOUND
        })?;

    let (a, aaaa): (Vec<IpAddr>, Vec<IpAddr>) = addrs.map(|addr| addr.ip()).partition(IpAddr::is_ipv4);

    Ok(Json(LookupResponse { name, a, aaaa }))
}

fn is_hostname(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
