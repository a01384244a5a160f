//! reCAPTCHA `siteverify` client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use gatehouse_common::VerificationOutcome;

use super::{ChallengeVerifier, VerifyError};

/// Response body of the siteverify endpoint
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default)]
    challenge_ts: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Verifies challenge tokens with Google reCAPTCHA
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    private_key: String,
    verify_url: String,
    timeout: Duration,
}

impl RecaptchaVerifier {
    pub fn new(
        private_key: impl Into<String>,
        verify_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            private_key: private_key.into(),
            verify_url: verify_url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl ChallengeVerifier for RecaptchaVerifier {
    async fn verify(
        &self,
        token: &str,
        remote_ip: &str,
    ) -> Result<VerificationOutcome, VerifyError> {
        let params = [
            ("secret", self.private_key.as_str()),
            ("response", token),
            ("remoteip", remote_ip),
        ];

        let response = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifyError::Timeout(self.timeout)
                } else {
                    VerifyError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerifyError::InvalidResponse(format!("HTTP {status}")));
        }

        let body: SiteverifyResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::InvalidResponse(e.to_string()))?;

        if body.success {
            tracing::debug!(
                remote_ip = %remote_ip,
                hostname = ?body.hostname,
                challenge_ts = ?body.challenge_ts,
                "reCAPTCHA accepted"
            );
        } else {
            tracing::debug!(
                remote_ip = %remote_ip,
                error_codes = ?body.error_codes,
                "reCAPTCHA rejected"
            );
        }

        Ok(VerificationOutcome::from(body.success))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Form, Json, Router, http::StatusCode, routing::post};
    use std::collections::HashMap;

    /// Stand-in siteverify endpoint: passes only token "good" from 203.0.113.5
    async fn fake_siteverify(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
        let ok = form.get("secret").map(String::as_str) == Some("private")
            && form.get("response").map(String::as_str) == Some("good")
            && form.get("remoteip").map(String::as_str) == Some("203.0.113.5");

        if ok {
            Json(serde_json::json!({
                "success": true,
                "challenge_ts": "2024-01-01T00:00:00Z",
                "hostname": "localhost"
            }))
        } else {
            Json(serde_json::json!({
                "success": false,
                "error-codes": ["invalid-input-response"]
            }))
        }
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/siteverify")
    }

    fn verifier(url: String, timeout: Duration) -> RecaptchaVerifier {
        RecaptchaVerifier::new("private", url, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_success() {
        let url = spawn(Router::new().route("/siteverify", post(fake_siteverify))).await;
        let outcome = verifier(url, Duration::from_secs(5))
            .verify("good", "203.0.113.5")
            .await
            .unwrap();
        assert_eq!(outcome, VerificationOutcome::Passed);
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let url = spawn(Router::new().route("/siteverify", post(fake_siteverify))).await;
        let outcome = verifier(url, Duration::from_secs(5))
            .verify("bad", "203.0.113.5")
            .await
            .unwrap();
        assert_eq!(outcome, VerificationOutcome::Failed);
    }

    #[tokio::test]
    async fn test_remote_ip_is_sent() {
        let url = spawn(Router::new().route("/siteverify", post(fake_siteverify))).await;
        let outcome = verifier(url, Duration::from_secs(5))
            .verify("good", "198.51.100.9")
            .await
            .unwrap();
        assert_eq!(outcome, VerificationOutcome::Failed);
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let url = spawn(app).await;
        let err = verifier(url, Duration::from_secs(5))
            .verify("good", "203.0.113.5")
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_garbage_body_is_unavailable() {
        let app = Router::new().route("/siteverify", post(|| async { "not json" }));
        let url = spawn(app).await;
        let err = verifier(url, Duration::from_secs(5))
            .verify("good", "203.0.113.5")
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_verifier_times_out() {
        let app = Router::new().route(
            "/siteverify",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "success": true }))
            }),
        );
        let url = spawn(app).await;
        let err = verifier(url, Duration::from_millis(100))
            .verify("good", "203.0.113.5")
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_verifier() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = verifier(format!("http://{addr}/siteverify"), Duration::from_secs(2))
            .verify("good", "203.0.113.5")
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Transport(_)));
    }
}
