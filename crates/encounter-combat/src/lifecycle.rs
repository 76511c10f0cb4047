//! Combat lifecycle: start, pause, resume, end.
//!
//! Pausing freezes the round timer by recording `paused_at`. Resuming shifts
//! `started_at` forward by the paused span so elapsed time never includes
//! time spent paused.

use encounter_common::{add_millis, millis_between, Timestamp};
use thiserror::Error;
use tracing::debug;

use crate::turn::CombatState;

/// Lifecycle transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Combat cannot start without someone able to act
    #[error("combat has no eligible participants")]
    NoParticipants,
    /// Combat is already running
    #[error("combat is already active")]
    AlreadyActive,
    /// Combat is not running
    #[error("combat is not active")]
    NotActive,
}

/// Result type for lifecycle transitions.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl CombatState {
    /// Start combat: sort initiative, begin round 1 with the first eligible participant.
    pub fn start_combat(&mut self, now: Timestamp) -> LifecycleResult<()> {
        if self.is_active {
            return Err(LifecycleError::AlreadyActive);
        }

        self.sort_initiative();
        let first = self.first_eligible().ok_or(LifecycleError::NoParticipants)?;

        self.is_active = true;
        self.round = 1;
        self.current_turn = first;
        self.started_at = Some(now);
        self.paused_at = None;

        debug!(participants = self.participants.len(), "Combat started");
        Ok(())
    }

    /// Pause the round timer. Returns `false` if already paused.
    pub fn pause(&mut self, now: Timestamp) -> LifecycleResult<bool> {
        if !self.is_active {
            return Err(LifecycleError::NotActive);
        }
        if self.paused_at.is_some() {
            return Ok(false);
        }
        self.paused_at = Some(now);
        Ok(true)
    }

    /// Resume the round timer. Returns how long combat was paused, in ms.
    pub fn resume(&mut self, now: Timestamp) -> LifecycleResult<u64> {
        if !self.is_active {
            return Err(LifecycleError::NotActive);
        }
        let Some(paused_at) = self.paused_at.take() else {
            return Ok(0);
        };

        let paused_for = millis_between(paused_at, now);
        self.started_at = self.started_at.map(|start| add_millis(start, paused_for));
        debug!(paused_for, "Combat resumed");
        Ok(paused_for)
    }

    /// Pause if running, resume if paused. Returns the new paused state.
    pub fn toggle_pause(&mut self, now: Timestamp) -> LifecycleResult<bool> {
        if self.is_paused() {
            self.resume(now)?;
            Ok(false)
        } else {
            self.pause(now)
        }
    }

    /// End combat, clearing timers and the turn pointer.
    ///
    /// Participants are kept. Returns the number of rounds fought.
    pub fn end_combat(&mut self) -> LifecycleResult<u32> {
        if !self.is_active {
            return Err(LifecycleError::NotActive);
        }
        let rounds = self.round;

        self.is_active = false;
        self.started_at = None;
        self.paused_at = None;
        self.current_turn = 0;
        self.round = 0;

        debug!(rounds, "Combat ended");
        Ok(rounds)
    }
}
