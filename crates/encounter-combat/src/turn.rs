//! Combat state and turn advancement.
//!
//! `advance_turn` is the only operation in the engine that mutates state. It
//! does no precondition checks of its own: callers make sure combat is active
//! and not paused, and persist the mutated state afterwards.

use encounter_common::{ParticipantId, Timestamp, TurnError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::participant::Participant;
use crate::timing::TimestampSource;

// ============================================================================
// Combat State
// ============================================================================

/// When turn advancement restarts the round timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimerReset {
    /// Only when initiative wraps around to a new round.
    #[default]
    NewRound,
    /// On every turn.
    EveryTurn,
}

/// Persisted combat state for one encounter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatState {
    /// Combat is running.
    pub is_active: bool,
    /// Start of the current round timer window.
    pub started_at: Option<Timestamp>,
    /// Set while combat is paused.
    pub paused_at: Option<Timestamp>,
    /// Index of the participant whose turn it is.
    pub current_turn: usize,
    /// Round counter, 1-based once combat starts.
    pub round: u32,
    /// Per-round budget in milliseconds.
    pub round_time_limit: Option<u64>,
    /// Round timer restart policy.
    pub timer_reset: TimerReset,
    /// Participants in initiative order.
    pub participants: Vec<Participant>,
}

impl CombatState {
    /// Create an empty, inactive combat.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-round budget.
    #[must_use]
    pub fn with_round_time_limit(mut self, limit_ms: u64) -> Self {
        self.round_time_limit = Some(limit_ms);
        self
    }

    /// Set the round timer restart policy.
    #[must_use]
    pub fn with_timer_reset(mut self, reset: TimerReset) -> Self {
        self.timer_reset = reset;
        self
    }

    /// Whether a round timer is configured.
    #[must_use]
    pub fn has_round_timer(&self) -> bool {
        self.round_time_limit.is_some_and(|limit| limit > 0)
    }

    /// Whether the server has recorded a pause.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Server timestamps as a calculator input.
    #[must_use]
    pub fn timestamp_source(&self) -> TimestampSource {
        TimestampSource::server(self.started_at, self.paused_at)
    }

    /// Participant whose turn it is.
    #[must_use]
    pub fn current_participant(&self) -> Option<&Participant> {
        self.participants.get(self.current_turn)
    }

    /// Index of the first participant able to act.
    #[must_use]
    pub fn first_eligible(&self) -> Option<usize> {
        self.participants.iter().position(Participant::is_eligible)
    }

    fn check_turn_structure(&self) -> Result<usize, TurnError> {
        let len = self.participants.len();
        if self.first_eligible().is_none() {
            return Err(TurnError::NoEligibleParticipants);
        }
        if self.current_turn >= len {
            return Err(TurnError::InvalidTurnIndex {
                index: self.current_turn,
                len,
            });
        }
        Ok(len)
    }

    /// Move to the next eligible participant, wrapping into a new round.
    ///
    /// On failure the state is left untouched.
    pub fn advance_turn(&mut self, now: Timestamp) -> Result<TurnAdvance, TurnError> {
        let len = self.check_turn_structure()?;

        let mut index = self.current_turn;
        let mut new_round = false;
        loop {
            index = (index + 1) % len;
            if index == 0 {
                new_round = true;
            }
            if self.participants[index].is_eligible() {
                break;
            }
        }

        self.current_turn = index;
        if new_round {
            self.round = self.round.saturating_add(1);
        }
        if new_round || self.timer_reset == TimerReset::EveryTurn {
            self.started_at = Some(now);
        }

        let advance = self.turn_advance(new_round);
        debug!(
            round = advance.round,
            turn = advance.turn,
            new_round,
            "Advanced turn"
        );
        Ok(advance)
    }

    /// Step back to the previous eligible participant.
    ///
    /// Never rewinds past the first turn of round 1; at that point the pointer
    /// stays where it is.
    pub fn previous_turn(&mut self, now: Timestamp) -> Result<TurnAdvance, TurnError> {
        let len = self.check_turn_structure()?;

        let mut index = self.current_turn;
        let mut round_back = false;
        loop {
            if index == 0 {
                if self.round <= 1 || round_back {
                    return Ok(self.turn_advance(false));
                }
                index = len - 1;
                round_back = true;
            } else {
                index -= 1;
            }
            if self.participants[index].is_eligible() {
                break;
            }
        }

        self.current_turn = index;
        if round_back {
            self.round = self.round.saturating_sub(1).max(1);
        }
        if round_back || self.timer_reset == TimerReset::EveryTurn {
            self.started_at = Some(now);
        }
        Ok(self.turn_advance(round_back))
    }

    fn turn_advance(&self, round_changed: bool) -> TurnAdvance {
        TurnAdvance {
            participant: self.current_participant().map(|p| p.id),
            turn: self.current_turn,
            round: self.round,
            round_changed,
        }
    }
}

/// Outcome of a turn move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAdvance {
    /// Participant now acting.
    pub participant: Option<ParticipantId>,
    /// Turn pointer after the move.
    pub turn: usize,
    /// Round after the move.
    pub round: u32,
    /// The move crossed a round boundary.
    pub round_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantKind;
    use encounter_common::from_epoch_millis;

    fn combat(initiatives: &[i32]) -> CombatState {
        let mut state = CombatState::new();
        for (i, initiative) in initiatives.iter().enumerate() {
            state.add_participant(Participant::new(
                format!("P{i}"),
                ParticipantKind::Player,
                *initiative,
            ));
        }
        state.is_active = true;
        state.round = 1;
        state.started_at = Some(from_epoch_millis(0));
        state
    }

    #[test]
    fn test_advance_moves_pointer() {
        let mut state = combat(&[20, 15, 10]);
        let advance = state.advance_turn(from_epoch_millis(1_000)).expect("advance");
        assert_eq!(advance.turn, 1);
        assert_eq!(advance.round, 1);
        assert!(!advance.round_changed);
        assert_eq!(state.started_at, Some(from_epoch_millis(0)));
    }

    #[test]
    fn test_advance_wraps_into_new_round() {
        let mut state = combat(&[20, 15]);
        state.current_turn = 1;
        let advance = state.advance_turn(from_epoch_millis(9_000)).expect("advance");
        assert_eq!(advance.turn, 0);
        assert_eq!(advance.round, 2);
        assert!(advance.round_changed);
        assert_eq!(state.started_at, Some(from_epoch_millis(9_000)));
    }

    #[test]
    fn test_every_turn_reset_restarts_timer() {
        let mut state = combat(&[20, 15]).with_timer_reset(TimerReset::EveryTurn);
        state.advance_turn(from_epoch_millis(4_000)).expect("advance");
        assert_eq!(state.started_at, Some(from_epoch_millis(4_000)));
        assert_eq!(state.round, 1);
    }

    #[test]
    fn test_single_participant_wraps_to_itself() {
        let mut state = combat(&[12]);
        let only = state.participants[0].id;
        let advance = state.advance_turn(from_epoch_millis(500)).expect("advance");
        assert_eq!(advance.participant, Some(only));
        assert_eq!(advance.turn, 0);
        assert_eq!(advance.round, 2);
    }

    #[test]
    fn test_empty_combat_fails_unmutated() {
        let mut state = combat(&[]);
        let before = state.clone();
        assert_eq!(
            state.advance_turn(from_epoch_millis(500)),
            Err(TurnError::NoEligibleParticipants)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_all_defeated_fails_unmutated() {
        let mut state = combat(&[10, 5]);
        for p in &mut state.participants {
            p.defeated = true;
        }
        let before = state.clone();
        assert_eq!(
            state.advance_turn(from_epoch_millis(500)),
            Err(TurnError::NoEligibleParticipants)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_malformed_pointer_fails_unmutated() {
        let mut state = combat(&[10, 5]);
        state.current_turn = 7;
        let before = state.clone();
        assert_eq!(
            state.advance_turn(from_epoch_millis(500)),
            Err(TurnError::InvalidTurnIndex { index: 7, len: 2 })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_advance_skips_defeated() {
        let mut state = combat(&[20, 15, 10]);
        state.participants[1].defeated = true;
        let advance = state.advance_turn(from_epoch_millis(1_000)).expect("advance");
        assert_eq!(advance.turn, 2);

        state.participants[0].defeated = true;
        let advance = state.advance_turn(from_epoch_millis(2_000)).expect("advance");
        assert_eq!(advance.turn, 2);
        assert_eq!(advance.round, 2);
    }

    #[test]
    fn test_previous_turn_steps_back_across_round() {
        let mut state = combat(&[20, 15, 10]);
        state.round = 2;
        let advance = state.previous_turn(from_epoch_millis(3_000)).expect("rewind");
        assert_eq!(advance.turn, 2);
        assert_eq!(advance.round, 1);
        assert!(advance.round_changed);
    }

    #[test]
    fn test_previous_turn_stops_at_first_round() {
        let mut state = combat(&[20, 15, 10]);
        let advance = state.previous_turn(from_epoch_millis(3_000)).expect("rewind");
        assert_eq!(advance.turn, 0);
        assert_eq!(advance.round, 1);
        assert!(!advance.round_changed);
        assert_eq!(state.started_at, Some(from_epoch_millis(0)));
    }

    #[test]
    fn test_round_timer_flag() {
        assert!(!CombatState::new().has_round_timer());
        assert!(!CombatState::new().with_round_time_limit(0).has_round_timer());
        assert!(CombatState::new().with_round_time_limit(30_000).has_round_timer());
    }

    #[test]
    fn test_state_json_defaults_missing_fields() {
        let state: CombatState =
            serde_json::from_str(r#"{"is_active":true,"round":3}"#).expect("deserialize");
        assert!(state.is_active);
        assert_eq!(state.round, 3);
        assert_eq!(state.timer_reset, TimerReset::NewRound);
        assert!(state.participants.is_empty());
    }
}
