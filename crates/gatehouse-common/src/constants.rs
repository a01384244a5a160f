//! Shared constants for Gatehouse components.

/// Default Warden HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8890";

/// Default name of the verification cookie
pub const DEFAULT_COOKIE_NAME: &str = "reCAPTCHA";

/// Lifetime of an issued verification cookie (24 hours)
pub const COOKIE_TTL_SECS: i64 = 24 * 60 * 60;

/// Largest encoded cookie value browsers reliably accept
pub const MAX_COOKIE_VALUE_LEN: usize = 4096;

/// Tolerated clock skew for tokens stamped in the future
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Default timeout for the outbound siteverify call
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 10;

/// Google reCAPTCHA verification endpoint
pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Key material sizes
pub mod keys {
    /// ChaCha20-Poly1305 key length
    pub const BLOCK_KEY_LEN: usize = 32;

    /// Accepted HMAC-SHA256 key lengths
    pub const HASH_KEY_LENS: [usize; 2] = [32, 64];

    /// AEAD nonce length
    pub const NONCE_LEN: usize = 12;

    /// HMAC-SHA256 tag length
    pub const MAC_LEN: usize = 32;

    /// Poly1305 tag length
    pub const AEAD_TAG_LEN: usize = 16;
}
