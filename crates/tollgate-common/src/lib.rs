//! # Tollgate Common
//!
//! Shared types, error kinds, and constants used across Tollgate components.
//!
//! ## Modules
//! - `types` - Wire types and flow parameters (MobilePolicy, Dispatch, etc.)
//! - `error` - The verification error taxonomy
//! - `constants` - Defaults, cache key layout, and errno values

pub mod constants;
pub mod error;
pub mod types;

pub use error::TollgateError;
pub use types::*;
