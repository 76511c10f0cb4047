//! Encounter service.
//!
//! Host-side wrapper around the engine. Each operation loads a session from
//! the store, validates the preconditions the engine leaves to its caller,
//! applies the transition and saves the result. Operations on the same
//! session are serialized through a per-session lock.

use std::sync::Arc;

use dashmap::DashMap;
use encounter_common::{SessionId, StoreError, Timestamp, TurnError};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{EncounterEvent, EventBus};
use crate::lifecycle::LifecycleError;
use crate::participant::ParticipantError;
use crate::snapshot::TimerSnapshot;
use crate::store::EncounterStore;
use crate::timer_state::TimerThresholds;
use crate::timing::{LocalTimestamps, PauseAuthority};
use crate::turn::{CombatState, TurnAdvance};

// ============================================================================
// Service Error
// ============================================================================

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service operation error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Session does not exist
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    /// Combat is not running
    #[error("Combat is not active in session {0}")]
    CombatInactive(SessionId),
    /// Combat is paused
    #[error("Combat is paused in session {0}")]
    CombatPaused(SessionId),
    /// Turn pointer could not move
    #[error("Turn advance failed: {0}")]
    Turn(#[from] TurnError),
    /// Lifecycle transition rejected
    #[error("Invalid combat transition: {0}")]
    Lifecycle(#[from] LifecycleError),
    /// Participant edit rejected
    #[error("Participant error: {0}")]
    Participant(#[from] ParticipantError),
    /// Store read or write failed
    #[error("Persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// HTTP status an endpoint should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::CombatInactive(_)
            | Self::CombatPaused(_)
            | Self::Turn(_)
            | Self::Lifecycle(_)
            | Self::Participant(_) => 400,
            Self::Store(_) => 500,
        }
    }
}

// ============================================================================
// Encounter Service
// ============================================================================

/// Serializes combat transitions per session over an [`EncounterStore`].
#[derive(Debug)]
pub struct EncounterService<S> {
    store: S,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
    events: EventBus,
    thresholds: TimerThresholds,
}

impl<S: EncounterStore> EncounterService<S> {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            events: EventBus::default(),
            thresholds: TimerThresholds::default(),
        }
    }

    /// Replace the event bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Replace the timer thresholds used by [`Self::snapshot`].
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: TimerThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Event bus the service publishes to.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn session_lock(&self, session: SessionId) -> Arc<Mutex<()>> {
        self.locks.entry(session).or_default().clone()
    }

    fn load(&self, session: SessionId) -> ServiceResult<CombatState> {
        self.store
            .load(session)?
            .ok_or(ServiceError::NotFound(session))
    }

    /// Load, mutate and save under the session lock.
    ///
    /// Nothing is saved if `apply` fails. Lock entries are only kept for
    /// sessions that exist.
    fn update<T>(
        &self,
        session: SessionId,
        apply: impl FnOnce(&mut CombatState) -> ServiceResult<T>,
    ) -> ServiceResult<(CombatState, T)> {
        let lock = self.session_lock(session);
        let result = {
            let _guard = lock.lock();
            self.load(session).and_then(|mut state| {
                let output = apply(&mut state)?;
                if let Err(e) = self.store.save(session, &state) {
                    warn!(%session, "Failed to persist combat state: {e}");
                    return Err(e.into());
                }
                Ok((state, output))
            })
        };
        drop(lock);

        if matches!(result, Err(ServiceError::NotFound(_))) {
            self.release_lock(session);
        }
        result
    }

    /// Drop the lock entry of a session nobody else is holding.
    fn release_lock(&self, session: SessionId) {
        let _ = self
            .locks
            .remove_if(&session, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Store a new session.
    pub fn create_session(&self, state: &CombatState) -> ServiceResult<SessionId> {
        let session = SessionId::new();
        self.store.save(session, state)?;
        info!(%session, participants = state.participants.len(), "Created encounter session");
        Ok(session)
    }

    /// Fetch a session.
    pub fn get(&self, session: SessionId) -> ServiceResult<CombatState> {
        self.load(session)
    }

    /// Delete a session.
    pub fn delete_session(&self, session: SessionId) -> ServiceResult<()> {
        let lock = self.session_lock(session);
        let removed = {
            let _guard = lock.lock();
            self.store.remove(session)?
        };
        self.locks.remove(&session);
        if removed {
            Ok(())
        } else {
            Err(ServiceError::NotFound(session))
        }
    }

    /// Apply an arbitrary edit (participants, hit points) to a session.
    pub fn edit<T>(
        &self,
        session: SessionId,
        edit: impl FnOnce(&mut CombatState) -> Result<T, ParticipantError>,
    ) -> ServiceResult<T> {
        let (_, output) = self.update(session, |state| Ok(edit(state)?))?;
        Ok(output)
    }

    /// Start combat.
    pub fn start(&self, session: SessionId, now: Timestamp) -> ServiceResult<CombatState> {
        let (state, ()) = self.update(session, |state| Ok(state.start_combat(now)?))?;
        info!(%session, "Combat started");
        self.events.publish(EncounterEvent::CombatStarted {
            session,
            participant: state.current_participant().map(|p| p.id),
        });
        Ok(state)
    }

    /// Advance to the next turn.
    ///
    /// Rejects inactive or paused combat before touching the engine.
    pub fn next_turn(&self, session: SessionId, now: Timestamp) -> ServiceResult<CombatState> {
        let (state, advance) = self.update(session, |state| {
            Self::ensure_running(session, state)?;
            Ok(state.advance_turn(now)?)
        })?;
        self.publish_turn(session, advance);
        Ok(state)
    }

    /// Step back one turn.
    pub fn previous_turn(&self, session: SessionId, now: Timestamp) -> ServiceResult<CombatState> {
        let (state, advance) = self.update(session, |state| {
            Self::ensure_running(session, state)?;
            Ok(state.previous_turn(now)?)
        })?;
        self.publish_turn(session, advance);
        Ok(state)
    }

    /// Pause combat.
    pub fn pause(&self, session: SessionId, now: Timestamp) -> ServiceResult<CombatState> {
        let (state, paused) = self.update(session, |state| Ok(state.pause(now)?))?;
        if paused {
            debug!(%session, "Combat paused");
            self.events.publish(EncounterEvent::CombatPaused { session });
        }
        Ok(state)
    }

    /// Resume combat.
    pub fn resume(&self, session: SessionId, now: Timestamp) -> ServiceResult<CombatState> {
        let (state, (was_paused, paused_ms)) = self.update(session, |state| {
            let was_paused = state.is_paused();
            Ok((was_paused, state.resume(now)?))
        })?;
        if was_paused {
            debug!(%session, paused_ms, "Combat resumed");
            self.events
                .publish(EncounterEvent::CombatResumed { session, paused_ms });
        }
        Ok(state)
    }

    /// End combat.
    pub fn end(&self, session: SessionId) -> ServiceResult<CombatState> {
        let (state, rounds) = self.update(session, |state| Ok(state.end_combat()?))?;
        info!(%session, rounds, "Combat ended");
        self.events
            .publish(EncounterEvent::CombatEnded { session, rounds });
        Ok(state)
    }

    /// Timer snapshot for display at `now`.
    pub fn snapshot(
        &self,
        session: SessionId,
        local: &LocalTimestamps,
        authority: PauseAuthority,
        now: Timestamp,
    ) -> ServiceResult<TimerSnapshot> {
        let state = self.load(session)?;
        Ok(TimerSnapshot::capture(
            &state,
            local,
            authority,
            &self.thresholds,
            now,
        ))
    }

    fn ensure_running(session: SessionId, state: &CombatState) -> ServiceResult<()> {
        if !state.is_active {
            return Err(ServiceError::CombatInactive(session));
        }
        if state.is_paused() {
            return Err(ServiceError::CombatPaused(session));
        }
        Ok(())
    }

    fn publish_turn(&self, session: SessionId, advance: TurnAdvance) {
        debug!(%session, round = advance.round, turn = advance.turn, "Turn changed");
        if advance.round_changed {
            self.events.publish(EncounterEvent::RoundStarted {
                session,
                round: advance.round,
            });
        }
        self.events.publish(EncounterEvent::TurnAdvanced {
            session,
            participant: advance.participant,
            round: advance.round,
        });
    }
}
