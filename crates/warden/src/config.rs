//! Configuration management for Warden.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use gatehouse_common::constants::{
    COOKIE_TTL_SECS, DEFAULT_COOKIE_NAME, DEFAULT_LISTEN_ADDR, DEFAULT_VERIFY_TIMEOUT_SECS,
    RECAPTCHA_VERIFY_URL,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Challenge verifier configuration
    #[serde(default)]
    pub recaptcha: RecaptchaConfig,

    /// Verification cookie configuration
    #[serde(default)]
    pub recaptcha_cookie: CookieConfig,
}

/// reCAPTCHA verifier configuration
#[derive(Clone, Deserialize)]
pub struct RecaptchaConfig {
    /// Secret used to authenticate with the verifier
    #[serde(default)]
    pub private_key: String,

    /// Site key handed to the challenge widget
    #[serde(default)]
    pub public_key: Option<String>,

    /// siteverify endpoint
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Upper bound on a single verification call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RecaptchaConfig {
    fn default() -> Self {
        Self {
            private_key: String::new(),
            public_key: None,
            verify_url: default_verify_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl std::fmt::Debug for RecaptchaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecaptchaConfig")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("verify_url", &self.verify_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Verification cookie configuration
#[derive(Clone, Deserialize)]
pub struct CookieConfig {
    /// Cookie identifier
    #[serde(default = "default_cookie_name")]
    pub name: String,

    /// Base64 HMAC key (32 or 64 bytes); ephemeral when unset
    #[serde(default)]
    pub hash_key: Option<String>,

    /// Base64 encryption key (32 bytes); ephemeral when unset
    #[serde(default)]
    pub block_key: Option<String>,

    /// Oldest cookie accepted, in seconds
    #[serde(default = "default_max_age")]
    pub max_age_secs: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            hash_key: None,
            block_key: None,
            max_age_secs: default_max_age(),
        }
    }
}

impl std::fmt::Debug for CookieConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieConfig")
            .field("name", &self.name)
            .field("hash_key", &self.hash_key.as_ref().map(|_| "<redacted>"))
            .field("block_key", &self.block_key.as_ref().map(|_| "<redacted>"))
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_verify_url() -> String { RECAPTCHA_VERIFY_URL.to_string() }
fn default_timeout() -> u64 { DEFAULT_VERIFY_TIMEOUT_SECS }
fn default_cookie_name() -> String { DEFAULT_COOKIE_NAME.to_string() }
fn default_max_age() -> i64 { COOKIE_TTL_SECS } // same as cookie lifetime

impl AppConfig {
    /// Load configuration from file and `WARDEN_*` environment, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to load config")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref key) = args.recaptcha_private_key {
            config.recaptcha.private_key = key.clone();
        }
        if let Some(ref name) = args.cookie_name {
            config.recaptcha_cookie.name = name.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gate cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.recaptcha_cookie.name.trim().is_empty() {
            bail!("recaptcha_cookie.name must not be empty");
        }
        if self.recaptcha.timeout_secs == 0 {
            bail!("recaptcha.timeout_secs must be greater than zero");
        }
        if self.recaptcha.private_key.is_empty() {
            tracing::warn!("recaptcha.private_key is empty; every challenge will be rejected");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            recaptcha: RecaptchaConfig::default(),
            recaptcha_cookie: CookieConfig::default(),
        }
    }
}
