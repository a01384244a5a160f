//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::captcha::{ChallengeVerifier, RecaptchaVerifier};
use crate::config::AppConfig;
use crate::cookie::{CookieCodec, CookieKeys};
use crate::gate::Gate;

/// Shared application state; everything in here is read-only after startup
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Cookie codec plus challenge verifier
    pub gate: Arc<Gate>,
}

impl AppState {
    /// Build state from configuration, loading key material and the verifier client
    pub fn new(config: AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.recaptcha.timeout_secs);

        let verifier = RecaptchaVerifier::new(
            config.recaptcha.private_key.clone(),
            config.recaptcha.verify_url.clone(),
            timeout,
        )
        .context("Failed to build reCAPTCHA client")?;

        Self::with_verifier(config, Arc::new(verifier))
    }

    /// Build state around an arbitrary verifier
    pub fn with_verifier(config: AppConfig, verifier: Arc<dyn ChallengeVerifier>) -> Result<Self> {
        let cookie = &config.recaptcha_cookie;
        let keys = CookieKeys::load(cookie.hash_key.as_deref(), cookie.block_key.as_deref())
            .context("Failed to load cookie keys")?;
        let codec = CookieCodec::new(cookie.name.clone(), keys, cookie.max_age_secs);

        let timeout = Duration::from_secs(config.recaptcha.timeout_secs);
        let gate = Arc::new(Gate::new(codec, verifier, timeout));

        Ok(Self {
            config: Arc::new(config),
            gate,
        })
    }
}
