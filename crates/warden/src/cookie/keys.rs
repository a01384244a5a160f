//! Key material for the verification cookie codec.

use anyhow::{Context, Result, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::Rng;

use gatehouse_common::constants::keys::{BLOCK_KEY_LEN, HASH_KEY_LENS};

/// Symmetric key pair: `hash_key` signs, `block_key` encrypts.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct CookieKeys {
    hash_key: Vec<u8>,
    block_key: [u8; BLOCK_KEY_LEN],
}

impl CookieKeys {
    /// Build from raw bytes, checking lengths
    pub fn new(hash_key: &[u8], block_key: &[u8]) -> Result<Self> {
        if !HASH_KEY_LENS.contains(&hash_key.len()) {
            bail!(
                "Invalid hash key length {} (expected one of {:?})",
                hash_key.len(),
                HASH_KEY_LENS
            );
        }

        let block_key: [u8; BLOCK_KEY_LEN] = block_key.try_into().with_context(|| {
            format!(
                "Invalid block key length {} (expected {})",
                block_key.len(),
                BLOCK_KEY_LEN
            )
        })?;

        Ok(Self {
            hash_key: hash_key.to_vec(),
            block_key,
        })
    }

    /// Decode base64 key material from configuration
    pub fn from_base64(hash_key_b64: &str, block_key_b64: &str) -> Result<Self> {
        let hash_key = STANDARD
            .decode(hash_key_b64.trim())
            .context("Failed to decode cookie hash key")?;
        let block_key = STANDARD
            .decode(block_key_b64.trim())
            .context("Failed to decode cookie block key")?;

        Self::new(&hash_key, &block_key)
    }

    /// Fresh random keys; cookies sealed with them die with the process
    pub fn generate() -> Self {
        let mut rng = rand::rng();

        let mut hash_key = vec![0u8; 64];
        rng.fill(hash_key.as_mut_slice());

        let mut block_key = [0u8; BLOCK_KEY_LEN];
        rng.fill(&mut block_key);

        Self { hash_key, block_key }
    }

    /// Load configured keys, falling back to ephemeral ones when either is unset
    pub fn load(hash_key_b64: Option<&str>, block_key_b64: Option<&str>) -> Result<Self> {
        match (hash_key_b64, block_key_b64) {
            (Some(hash), Some(block)) => Self::from_base64(hash, block),
            (None, None) => {
                tracing::warn!("Using ephemeral cookie keys (issued cookies will not survive restart)");
                Ok(Self::generate())
            }
            _ => bail!("Cookie hash_key and block_key must be configured together"),
        }
    }

    pub(crate) fn hash_key(&self) -> &[u8] {
        &self.hash_key
    }

    pub(crate) fn block_key(&self) -> &[u8; BLOCK_KEY_LEN] {
        &self.block_key
    }
}

impl std::fmt::Debug for CookieKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieKeys")
            .field("hash_key", &format_args!("[{} bytes]", self.hash_key.len()))
            .field("block_key", &format_args!("[{} bytes]", BLOCK_KEY_LEN))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_from_base64_accepts_valid_lengths() {
        let hash = STANDARD.encode([7u8; 32]);
        let block = STANDARD.encode([9u8; 32]);
        assert_ok!(CookieKeys::from_base64(&hash, &block));

        let long_hash = STANDARD.encode([7u8; 64]);
        assert_ok!(CookieKeys::from_base64(&long_hash, &block));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert_err!(CookieKeys::new(&[0u8; 16], &[0u8; 32]));
        assert_err!(CookieKeys::new(&[0u8; 32], &[0u8; 24]));
    }

    #[test]
    fn test_rejects_bad_base64() {
        let block = STANDARD.encode([9u8; 32]);
        assert!(CookieKeys::from_base64("not base64!!", &block).is_err());
    }

    #[test]
    fn test_load_requires_both_or_neither() {
        let key = STANDARD.encode([1u8; 32]);
        assert!(CookieKeys::load(Some(&key), None).is_err());
        assert!(CookieKeys::load(None, Some(&key)).is_err());
        assert!(CookieKeys::load(None, None).is_ok());
        assert!(CookieKeys::load(Some(&key), Some(&key)).is_ok());
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = CookieKeys::generate();
        let b = CookieKeys::generate();
        assert_ne!(a.block_key(), b.block_key());
    }

    #[test]
    fn test_debug_hides_material() {
        let keys = CookieKeys::new(&[0xAB; 32], &[0xCD; 32]).unwrap();
        let debug = format!("{:?}", keys);
        assert!(debug.contains("32 bytes"));
        assert!(!debug.contains("171"));
    }
}
