//! Client fingerprint derivation from request metadata.

use axum::http::{HeaderMap, header};
use std::borrow::Cow;
use std::net::SocketAddr;

use gatehouse_common::Fingerprint;

/// Declared user agent, or an empty string when missing.
///
/// Non-ASCII bytes are decoded lossily so an opaque agent never collapses to
/// the empty string.
pub fn user_agent(headers: &HeaderMap) -> Cow<'_, str> {
    headers
        .get(header::USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .unwrap_or(Cow::Borrowed(""))
}

/// Peer address with the port stripped
pub fn client_address(peer: &SocketAddr) -> String {
    peer.ip().to_string()
}

/// Fingerprint of the client behind `peer` sending `headers`
pub fn derive(peer: &SocketAddr, headers: &HeaderMap) -> Fingerprint {
    Fingerprint::from_ip(peer.ip(), &user_agent(headers))
}
