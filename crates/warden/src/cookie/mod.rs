//! Verification cookie: key material, sealing/opening, and fingerprints.

mod codec;
pub mod fingerprint;
mod keys;

pub use codec::{CodecError, CookieCodec, CookieRecord};
pub use keys::CookieKeys;
