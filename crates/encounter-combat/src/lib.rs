//! # Encounter Combat
//!
//! Combat timer and turn engine for the encounter tracker.
//!
//! This crate provides:
//! - Duration and round-time calculators
//! - Round timer classification (warning, critical, expired)
//! - Turn advancement over initiative order
//! - Combat lifecycle (start, pause, resume, end)
//! - Participants, hit points and initiative sorting
//! - Per-tick timer snapshots
//! - Event bus and encounter service over a pluggable store

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod events;
pub mod lifecycle;
pub mod participant;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod timer_state;
pub mod timing;
pub mod turn;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::events::*;
    pub use crate::lifecycle::*;
    pub use crate::participant::*;
    pub use crate::service::*;
    pub use crate::snapshot::*;
    pub use crate::store::*;
    pub use crate::timer_state::*;
    pub use crate::timing::*;
    pub use crate::turn::*;
}

pub use prelude::*;
