//! # Encounter Common
//!
//! Common types shared by the encounter tracker crates.
//!
//! This crate provides:
//! - ID types (SessionId, ParticipantId)
//! - Millisecond helpers over `chrono` timestamps
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod millis;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::millis::*;
}

pub use prelude::*;
