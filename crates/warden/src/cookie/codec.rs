//! Fingerprint cookie codec.
//!
//! Token layout (big-endian integers):
//!
//! ```text
//! base64url( issued_at:u64 | nonce:12 | ciphertext | mac:32 )
//!
//! ciphertext = ChaCha20-Poly1305(block_key, nonce, fingerprint, aad = cookie name)
//! mac        = HMAC-SHA256(hash_key, cookie name | "|" | issued_at | nonce | ciphertext)
//! ```
//!
//! The cookie name is bound into both the MAC and the AEAD associated data,
//! so a value sealed for one cookie cannot be replayed under another name.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, KeyInit, Nonce,
    aead::{Aead, Payload},
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;
use tower_cookies::Cookie;
use tower_cookies::cookie::time::OffsetDateTime;

use gatehouse_common::constants::keys::{AEAD_TAG_LEN, MAC_LEN, NONCE_LEN};
use gatehouse_common::constants::{COOKIE_TTL_SECS, MAX_CLOCK_SKEW_SECS, MAX_COOKIE_VALUE_LEN};
use gatehouse_common::{Fingerprint, GatehouseError};

use super::CookieKeys;

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_LEN: usize = 8;
const MIN_TOKEN_LEN: usize = TIMESTAMP_LEN + NONCE_LEN + AEAD_TAG_LEN + MAC_LEN;

/// Codec failures. Everything except `Encoding` means "no valid fingerprint".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("failed to seal cookie: {0}")]
    Encoding(String),

    #[error("malformed cookie value: {0}")]
    Malformed(&'static str),

    #[error("cookie failed integrity check")]
    Integrity,

    #[error("cookie expired (issued at {issued_at})")]
    Expired { issued_at: i64 },
}

impl CodecError {
    pub fn is_decoding(&self) -> bool {
        !matches!(self, Self::Encoding(_))
    }
}

impl From<CodecError> for GatehouseError {
    fn from(err: CodecError) -> Self {
        if err.is_decoding() {
            GatehouseError::Decoding(err.to_string())
        } else {
            GatehouseError::Encoding(err.to_string())
        }
    }
}

/// A freshly minted verification cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub path: &'static str,
    pub http_only: bool,
    pub expires: OffsetDateTime,
}

impl CookieRecord {
    /// Convert into a `Set-Cookie`-ready cookie
    pub fn into_cookie(self) -> Cookie<'static> {
        Cookie::build((self.name, self.value))
            .path(self.path)
            .http_only(self.http_only)
            .expires(self.expires)
            .build()
    }
}

/// Seals and opens fingerprint cookies under a fixed name and key pair
#[derive(Debug, Clone)]
pub struct CookieCodec {
    name: String,
    keys: CookieKeys,
    /// Oldest token accepted by `open`, in seconds
    max_age_secs: i64,
}

impl CookieCodec {
    pub fn new(name: impl Into<String>, keys: CookieKeys, max_age_secs: i64) -> Self {
        Self {
            name: name.into(),
            keys,
            max_age_secs,
        }
    }

    /// Name of the cookie this codec seals values for
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seal a fingerprint into a new cookie expiring 24 hours from now
    pub fn seal(&self, fingerprint: &Fingerprint) -> Result<CookieRecord, CodecError> {
        self.seal_at(fingerprint, Utc::now())
    }

    pub(crate) fn seal_at(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<CookieRecord, CodecError> {
        let value = self.encode(fingerprint.as_str(), now.timestamp())?;

        let expires = OffsetDateTime::from_unix_timestamp(now.timestamp() + COOKIE_TTL_SECS)
            .map_err(|e| CodecError::Encoding(format!("expiry out of range: {e}")))?;

        Ok(CookieRecord {
            name: self.name.clone(),
            value,
            path: "/",
            http_only: true,
            expires,
        })
    }

    /// Open a cookie value and return the fingerprint sealed inside it
    pub fn open(&self, value: &str) -> Result<Fingerprint, CodecError> {
        self.open_at(value, Utc::now())
    }

    pub(crate) fn open_at(&self, value: &str, now: DateTime<Utc>) -> Result<Fingerprint, CodecError> {
        if value.len() > MAX_COOKIE_VALUE_LEN {
            return Err(CodecError::Malformed("value too long"));
        }

        let raw = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|_| CodecError::Malformed("invalid base64"))?;

        if raw.len() < MIN_TOKEN_LEN {
            return Err(CodecError::Malformed("value too short"));
        }

        let (body, tag) = raw.split_at(raw.len() - MAC_LEN);
        self.mac(body)?
            .verify_slice(tag)
            .map_err(|_| CodecError::Integrity)?;

        let (stamp, rest) = body.split_at(TIMESTAMP_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let mut stamp_bytes = [0u8; TIMESTAMP_LEN];
        stamp_bytes.copy_from_slice(stamp);
        let issued_at = i64::try_from(u64::from_be_bytes(stamp_bytes))
            .map_err(|_| CodecError::Malformed("timestamp out of range"))?;

        let now = now.timestamp();
        if issued_at > now + MAX_CLOCK_SKEW_SECS {
            return Err(CodecError::Malformed("timestamp in the future"));
        }
        if self.max_age_secs > 0 && issued_at < now - self.max_age_secs {
            return Err(CodecError::Expired { issued_at });
        }

        let plaintext = self
            .cipher()
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: self.name.as_bytes(),
                },
            )
            .map_err(|_| CodecError::Integrity)?;

        String::from_utf8(plaintext)
            .map(Fingerprint::from)
            .map_err(|_| CodecError::Malformed("fingerprint is not UTF-8"))
    }

    fn encode(&self, fingerprint: &str, issued_at: i64) -> Result<String, CodecError> {
        let issued_at = u64::try_from(issued_at)
            .map_err(|_| CodecError::Encoding("timestamp before epoch".to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: fingerprint.as_bytes(),
                    aad: self.name.as_bytes(),
                },
            )
            .map_err(|e| CodecError::Encoding(format!("encryption failure: {e}")))?;

        let mut token =
            Vec::with_capacity(TIMESTAMP_LEN + NONCE_LEN + ciphertext.len() + MAC_LEN);
        token.extend_from_slice(&issued_at.to_be_bytes());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);

        let tag = self.mac(&token)?.finalize().into_bytes();
        token.extend_from_slice(&tag);

        let encoded = URL_SAFE_NO_PAD.encode(&token);
        if encoded.len() > MAX_COOKIE_VALUE_LEN {
            return Err(CodecError::Encoding(format!(
                "encoded value is {} bytes (limit {})",
                encoded.len(),
                MAX_COOKIE_VALUE_LEN
            )));
        }

        Ok(encoded)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.keys.block_key()))
    }

    fn mac(&self, body: &[u8]) -> Result<HmacSha256, CodecError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.keys.hash_key())
            .map_err(|e| CodecError::Encoding(format!("invalid hash key: {e}")))?;
        mac.update(self.name.as_bytes());
        mac.update(b"|");
        mac.update(body);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn codec() -> CookieCodec {
        let keys = CookieKeys::new(&[0x11; 32], &[0x22; 32]).unwrap();
        CookieCodec::new("reCAPTCHA", keys, COOKIE_TTL_SECS)
    }

    fn example_fingerprint() -> Fingerprint {
        Fingerprint::new("203.0.113.5", "TestAgent/1.0")
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let codec = codec();
        let record = codec.seal(&example_fingerprint()).unwrap();

        let opened = codec.open(&record.value).unwrap();
        assert_eq!(opened.as_str(), "203.0.113.5TestAgent/1.0");
    }

    #[test]
    fn test_record_fields() {
        let now = Utc::now();
        let record = codec().seal_at(&example_fingerprint(), now).unwrap();

        assert_eq!(record.name, "reCAPTCHA");
        assert_eq!(record.path, "/");
        assert!(record.http_only);
        assert_eq!(record.expires.unix_timestamp(), now.timestamp() + 24 * 3600);
    }

    #[test]
    fn test_each_seal_uses_fresh_nonce() {
        let codec = codec();
        let a = codec.seal(&example_fingerprint()).unwrap();
        let b = codec.seal(&example_fingerprint()).unwrap();
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn test_wrong_keys_fail() {
        let record = codec().seal(&example_fingerprint()).unwrap();

        let other = CookieCodec::new(
            "reCAPTCHA",
            CookieKeys::new(&[0x33; 32], &[0x22; 32]).unwrap(),
            COOKIE_TTL_SECS,
        );
        assert_eq!(other.open(&record.value), Err(CodecError::Integrity));

        let restarted = CookieCodec::new("reCAPTCHA", CookieKeys::generate(), COOKIE_TTL_SECS);
        assert!(restarted.open(&record.value).is_err());
    }

    #[test]
    fn test_same_hash_key_different_block_key_fails() {
        let record = codec().seal(&example_fingerprint()).unwrap();
        let other = CookieCodec::new(
            "reCAPTCHA",
            CookieKeys::new(&[0x11; 32], &[0x44; 32]).unwrap(),
            COOKIE_TTL_SECS,
        );
        assert_eq!(other.open(&record.value), Err(CodecError::Integrity));
    }

    #[test]
    fn test_every_flipped_byte_is_rejected() {
        let codec = codec();
        let record = codec.seal(&example_fingerprint()).unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&record.value).unwrap();

        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let value = URL_SAFE_NO_PAD.encode(&tampered);

            let err = codec.open(&value).unwrap_err();
            assert!(err.is_decoding(), "byte {i} produced {err:?}");
        }
    }

    #[test]
    fn test_cookie_name_is_bound() {
        let record = codec().seal(&example_fingerprint()).unwrap();

        let renamed = CookieCodec::new(
            "session",
            CookieKeys::new(&[0x11; 32], &[0x22; 32]).unwrap(),
            COOKIE_TTL_SECS,
        );
        assert_eq!(renamed.open(&record.value), Err(CodecError::Integrity));
    }

    #[test]
    fn test_expired_token() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(25);
        let record = codec.seal_at(&example_fingerprint(), issued).unwrap();

        match codec.open(&record.value) {
            Err(CodecError::Expired { issued_at }) => assert_eq!(issued_at, issued.timestamp()),
            other => panic!("expected expiry, got {other:?}"),
        }
    }

    #[test]
    fn test_future_token_rejected() {
        let codec = codec();
        let issued = Utc::now() + Duration::hours(1);
        let record = codec.seal_at(&example_fingerprint(), issued).unwrap();

        assert!(matches!(codec.open(&record.value), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_malformed_inputs() {
        let codec = codec();
        assert_eq!(codec.open(""), Err(CodecError::Malformed("value too short")));
        assert_eq!(codec.open("!!!"), Err(CodecError::Malformed("invalid base64")));
        assert_eq!(
            codec.open(&"A".repeat(MAX_COOKIE_VALUE_LEN + 1)),
            Err(CodecError::Malformed("value too long"))
        );
    }

    #[test]
    fn test_oversized_fingerprint_is_encoding_error() {
        let huge = Fingerprint::new("10.0.0.1", &"x".repeat(MAX_COOKIE_VALUE_LEN));
        let err = codec().seal(&huge).unwrap_err();
        assert!(!err.is_decoding());
        assert_eq!(GatehouseError::from(err).status_code(), 500);
    }

    #[test]
    fn test_into_cookie_attributes() {
        let cookie = codec().seal(&example_fingerprint()).unwrap().into_cookie();
        let header = cookie.to_string();

        assert!(header.starts_with("reCAPTCHA="));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Expires="));
    }
}
