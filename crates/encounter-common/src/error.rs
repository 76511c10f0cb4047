//! Error types for the encounter tracker.

use thiserror::Error;

use crate::SessionId;

/// Errors at the tracker's file boundary (configuration files).
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons the initiative pointer could not be moved.
///
/// Whenever one of these is returned the combat state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnError {
    /// Empty participant list, or every participant is defeated
    #[error("no eligible participants to advance to")]
    NoEligibleParticipants,

    /// Turn pointer does not index into the participant list
    #[error("turn index {index} out of range for {len} participants")]
    InvalidTurnIndex {
        /// Current turn pointer
        index: usize,
        /// Number of participants
        len: usize,
    },
}

/// Encounter store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend refused or failed the write
    #[error("Failed to save session {session}: {reason}")]
    SaveFailed {
        /// Session being written
        session: SessionId,
        /// Backend-specific reason
        reason: String,
    },

    /// Backend failed the read
    #[error("Failed to load session {session}: {reason}")]
    LoadFailed {
        /// Session being read
        session: SessionId,
        /// Backend-specific reason
        reason: String,
    },

    /// Stored data could not be decoded
    #[error("Invalid session data: {0}")]
    InvalidData(String),
}

/// Result type alias for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
