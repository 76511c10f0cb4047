//! Event bus for encounter notifications.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use encounter_common::{ParticipantId, SessionId};

use crate::timer_state::TimerBand;

/// Events published by the encounter service and the timer loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterEvent {
    /// Combat started
    CombatStarted {
        /// Session
        session: SessionId,
        /// First participant to act
        participant: Option<ParticipantId>,
    },
    /// Turn pointer moved
    TurnAdvanced {
        /// Session
        session: SessionId,
        /// Participant now acting
        participant: Option<ParticipantId>,
        /// Round after the move
        round: u32,
    },
    /// Initiative wrapped into a new round
    RoundStarted {
        /// Session
        session: SessionId,
        /// New round number
        round: u32,
    },
    /// Combat paused
    CombatPaused {
        /// Session
        session: SessionId,
    },
    /// Combat resumed
    CombatResumed {
        /// Session
        session: SessionId,
        /// How long combat was paused, in ms
        paused_ms: u64,
    },
    /// Combat ended
    CombatEnded {
        /// Session
        session: SessionId,
        /// Rounds fought
        rounds: u32,
    },
    /// Round timer changed band
    TimerBandChanged {
        /// Session
        session: SessionId,
        /// Band before
        from: TimerBand,
        /// Band after
        to: TimerBand,
    },
}

impl EncounterEvent {
    /// Session this event belongs to.
    #[must_use]
    pub fn session(&self) -> SessionId {
        match self {
            Self::CombatStarted { session, .. }
            | Self::TurnAdvanced { session, .. }
            | Self::RoundStarted { session, .. }
            | Self::CombatPaused { session }
            | Self::CombatResumed { session, .. }
            | Self::CombatEnded { session, .. }
            | Self::TimerBandChanged { session, .. } => *session,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<EncounterEvent>,
    /// Receiver for collecting events
    receiver: Receiver<EncounterEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: EncounterEvent) {
        // Non-blocking send - if full, event is dropped
        if self.sender.try_send(event).is_err() {
            tracing::warn!("Event bus full, dropping event");
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<EncounterEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<EncounterEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        let session = SessionId::new();
        bus.publish(EncounterEvent::CombatPaused { session });
        bus.publish(EncounterEvent::CombatResumed {
            session,
            paused_ms: 1_500,
        });

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.session() == session));
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops() {
        let bus = EventBus::new(1);
        let session = SessionId::new();
        bus.publish(EncounterEvent::CombatPaused { session });
        bus.publish(EncounterEvent::CombatEnded { session, rounds: 3 });

        let events = bus.drain();
        assert_eq!(events, vec![EncounterEvent::CombatPaused { session }]);
    }

    #[test]
    fn test_sender_handle() {
        let bus = EventBus::default();
        let session = SessionId::new();
        let sender = bus.sender();
        sender
            .send(EncounterEvent::RoundStarted { session, round: 2 })
            .expect("bus open");
        assert_eq!(bus.drain().len(), 1);
        assert_eq!(bus.capacity(), 1024);
    }
}
