//! Per-tick timer snapshots.
//!
//! A display loop captures one snapshot per tick with a fresh `now` and
//! compares it with the previous one to find band changes.

use encounter_common::{ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::timer_state::{TimerBand, TimerStates, TimerThresholds};
use crate::timing::{
    calculate_combat_duration, calculate_round_time_remaining, format_time, LocalTimestamps,
    PauseAuthority,
};
use crate::turn::CombatState;

/// Everything a round timer display needs for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Elapsed time in the current timer window.
    pub duration_ms: u64,
    /// Time left in the round budget.
    pub remaining_ms: u64,
    /// A round timer is configured and combat is running.
    pub has_round_timer: bool,
    /// Display flags.
    pub states: TimerStates,
    /// Collapsed display band.
    pub band: TimerBand,
    /// `duration_ms` as `M:SS`.
    pub duration_label: String,
    /// `remaining_ms` as `M:SS`.
    pub remaining_label: String,
    /// Current round.
    pub round: u32,
    /// Participant whose turn it is.
    pub participant: Option<ParticipantId>,
}

impl TimerSnapshot {
    /// Run the calculators over `state` at `now`.
    #[must_use]
    pub fn capture(
        state: &CombatState,
        local: &LocalTimestamps,
        authority: PauseAuthority,
        thresholds: &TimerThresholds,
        now: Timestamp,
    ) -> Self {
        let source = state
            .timestamp_source()
            .with_local(*local)
            .with_pause_authority(authority);
        let has_round_timer = state.has_round_timer() && state.is_active;

        let duration_ms = calculate_combat_duration(state.is_active, &source, now);
        let remaining_ms = calculate_round_time_remaining(
            has_round_timer,
            state.is_active,
            source.effective_start(),
            state.round_time_limit,
            duration_ms,
        );
        let states = thresholds.classify(has_round_timer, remaining_ms, &source);

        Self {
            duration_ms,
            remaining_ms,
            has_round_timer,
            states,
            band: states.band(has_round_timer),
            duration_label: format_time(duration_ms),
            remaining_label: format_time(remaining_ms),
            round: state.round,
            participant: state.current_participant().map(|p| p.id),
        }
    }

    /// Band change since `previous`, if any.
    ///
    /// A new turn or round counts as a fresh timer window, so the band is
    /// reported again even if it matches the previous one.
    #[must_use]
    pub fn transition_from(&self, previous: &Self) -> Option<TimerTransition> {
        let same_window = self.round == previous.round && self.participant == previous.participant;
        if same_window && self.band == previous.band {
            return None;
        }
        Some(TimerTransition {
            from: if same_window { previous.band } else { TimerBand::Idle },
            to: self.band,
        })
    }
}

/// A change of round timer band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTransition {
    /// Band before.
    pub from: TimerBand,
    /// Band after.
    pub to: TimerBand,
}

impl TimerTransition {
    /// The timer became more urgent.
    #[must_use]
    pub fn is_escalation(&self) -> bool {
        self.to > self.from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{Participant, ParticipantKind};
    use encounter_common::from_epoch_millis;

    fn session() -> CombatState {
        let mut state = CombatState::new().with_round_time_limit(20_000);
        state.add_participant(Participant::new("Aria", ParticipantKind::Player, 10));
        state.add_participant(Participant::new("Wolf", ParticipantKind::Monster, 7));
        state.start_combat(from_epoch_millis(0)).expect("start");
        state
    }

    fn capture(state: &CombatState, now: i64) -> TimerSnapshot {
        TimerSnapshot::capture(
            state,
            &LocalTimestamps::default(),
            PauseAuthority::default(),
            &TimerThresholds::default(),
            from_epoch_millis(now),
        )
    }

    #[test]
    fn test_end_to_end_critical_at_sixteen_seconds() {
        let state = session();
        let snap = capture(&state, 16_000);
        assert_eq!(snap.duration_ms, 16_000);
        assert_eq!(snap.remaining_ms, 4_000);
        assert!(snap.states.is_round_critical);
        assert!(!snap.states.is_paused);
        assert_eq!(snap.band, TimerBand::Critical);
        assert_eq!(snap.duration_label, "0:16");
        assert_eq!(snap.remaining_label, "0:04");
    }

    #[test]
    fn test_paused_snapshot_freezes() {
        let mut state = session();
        state.pause(from_epoch_millis(3_000)).expect("pause");
        let snap = capture(&state, 50_000);
        assert_eq!(snap.duration_ms, 3_000);
        assert_eq!(snap.remaining_ms, 17_000);
        assert!(snap.states.is_paused);
        assert_eq!(snap.band, TimerBand::Running);
    }

    #[test]
    fn test_transitions_reported_once() {
        let state = session();
        let running = capture(&state, 1_000);
        let still_running = capture(&state, 2_000);
        let warning = capture(&state, 6_000);

        assert_eq!(still_running.transition_from(&running), None);
        let transition = warning.transition_from(&still_running).expect("band changed");
        assert_eq!(transition.from, TimerBand::Running);
        assert_eq!(transition.to, TimerBand::Warning);
        assert!(transition.is_escalation());
    }

    #[test]
    fn test_new_turn_reports_band_again() {
        let mut state = session();
        let before = capture(&state, 1_000);
        state.advance_turn(from_epoch_millis(1_500)).expect("advance");
        let after = capture(&state, 2_000);

        let transition = after.transition_from(&before).expect("new window");
        assert_eq!(transition.from, TimerBand::Idle);
        assert_eq!(transition.to, TimerBand::Running);
    }

    #[test]
    fn test_inactive_snapshot_is_zeroed() {
        let mut state = session();
        state.end_combat().expect("end");
        let snap = capture(&state, 9_000);
        assert_eq!(snap.duration_ms, 0);
        assert_eq!(snap.remaining_ms, 0);
        assert_eq!(snap.duration_label, "0:00");
        assert_eq!(snap.band, TimerBand::Idle);
        assert!(!snap.states.is_round_expired);
    }
}
