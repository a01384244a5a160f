//! axum middleware wiring for the gate.

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tower_cookies::Cookies;

use super::{GateError, VerifiedClient};
use crate::cookie::fingerprint;
use crate::state::AppState;

/// Query parameter carrying the challenge response token from the widget
const CHALLENGE_PARAM: &str = "c";

/// First `c` value in the query string; repeats are ignored
fn challenge_token(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(key, _)| key == CHALLENGE_PARAM)
        .map(|(_, value)| value.as_str())
}

/// Require a verified client before running the rest of the chain.
///
/// - Matching cookie or accepted challenge: a fresh cookie is set and the
///   request continues with a [`VerifiedClient`] extension
/// - Denied challenge: 403, the next handler never runs
/// - Verifier unreachable: 503
/// - Cookie could not be minted: 500
pub async fn require_verification(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    cookies: Cookies,
    Query(query): Query<Vec<(String, String)>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let gate = &state.gate;
    let client_ip = fingerprint::client_address(&peer);
    let current = fingerprint::derive(&peer, req.headers());

    let presented = cookies.get(gate.cookie_name());
    let presented = presented.as_ref().map(|c| c.value());

    let admission = gate
        .admit(presented, current, challenge_token(&query), &client_ip)
        .await
        .inspect_err(|e| match e {
            GateError::Denied => {
                tracing::info!(client_ip = %client_ip, path = %req.uri().path(), "Challenge denied")
            }
            GateError::Unavailable(err) => {
                tracing::warn!(client_ip = %client_ip, error = %err, "Challenge verifier unavailable")
            }
            GateError::Mint(err) => {
                tracing::error!(client_ip = %client_ip, error = %err, "Failed to mint verification cookie")
            }
        })?;

    tracing::debug!(
        client_ip = %client_ip,
        verified_by = admission.verified_by.as_str(),
        "Request passed gate"
    );

    req.extensions_mut().insert(VerifiedClient {
        cookie_value: admission.cookie.value.clone(),
        fingerprint: admission.fingerprint,
        verified_by: admission.verified_by,
    });
    cookies.add(admission.cookie.into_cookie());

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_challenge_token_takes_first_value() {
        assert_eq!(challenge_token(&pairs(&[("c", "a"), ("c", "b")])), Some("a"));
        assert_eq!(challenge_token(&pairs(&[("x", "1"), ("c", "tok")])), Some("tok"));
        assert_eq!(challenge_token(&pairs(&[("x", "1")])), None);
        assert_eq!(challenge_token(&[]), None);
    }
}
