//! Core types shared across Gatehouse components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Client fingerprint: peer address (no port) followed by the user agent.
///
/// There is no delimiter between the two parts, so `("1.2.3.4", "5x")` and
/// `("1.2.3.45", "x")` produce the same fingerprint. It is only ever used as an
/// equality key against a value the server sealed itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a fingerprint from an already split address and user agent
    pub fn new(address: &str, user_agent: &str) -> Self {
        let mut value = String::with_capacity(address.len() + user_agent.len());
        value.push_str(address);
        value.push_str(user_agent);
        Self(value)
    }

    /// Build a fingerprint from a parsed peer IP
    pub fn from_ip(ip: IpAddr, user_agent: &str) -> Self {
        Self::new(&ip.to_string(), user_agent)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Short, log-safe form (length plus leading characters)
    pub fn redacted(&self) -> String {
        let head: String = self.0.chars().take(8).collect();
        format!("{}…({} bytes)", head, self.0.len())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for Fingerprint {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Result reported by the external challenge verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationOutcome {
    Passed,
    Failed,
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl From<bool> for VerificationOutcome {
    fn from(success: bool) -> Self {
        if success { Self::Passed } else { Self::Failed }
    }
}

/// How a request reached the verified state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifiedBy {
    /// A previously issued cookie matched the current fingerprint
    Cookie,
    /// The external verifier accepted a fresh challenge response
    Challenge,
}

impl VerifiedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Challenge => "challenge",
        }
    }
}

/// Payload for the challenge presence endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeStatus {
    /// True when no verification cookie is present and the widget should render
    pub display_challenge: bool,

    /// Public site key for the challenge widget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_key: Option<String>,
}
