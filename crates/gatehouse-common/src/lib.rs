//! # Gatehouse Common
//!
//! Shared types, errors, and constants used across Gatehouse components.
//!
//! ## Modules
//! - `types` - Core data structures (Fingerprint, VerificationOutcome, etc.)
//! - `error` - Common error type with HTTP status mapping
//! - `constants` - Cookie, key, and endpoint defaults

pub mod constants;
pub mod error;
pub mod types;

pub use error::GatehouseError;
pub use types::*;
