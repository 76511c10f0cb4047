//! Round timer classification.
//!
//! Maps a remaining-time value and the pause signal into display flags. The
//! pause flag and the round budget flags are independent of each other: a
//! paused round can also be expired.

use serde::{Deserialize, Serialize};

use crate::timing::TimestampSource;

/// Remaining time at or below which the round is in the warning band.
pub const WARNING_THRESHOLD_MS: u64 = 15_000;

/// Remaining time at or below which the round is in the critical band.
pub const CRITICAL_THRESHOLD_MS: u64 = 5_000;

// ============================================================================
// Thresholds
// ============================================================================

/// Warning and critical cut-offs in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerThresholds {
    /// Upper bound (inclusive) of the warning band.
    pub warning_ms: u64,
    /// Upper bound (inclusive) of the critical band.
    pub critical_ms: u64,
}

impl Default for TimerThresholds {
    fn default() -> Self {
        Self {
            warning_ms: WARNING_THRESHOLD_MS,
            critical_ms: CRITICAL_THRESHOLD_MS,
        }
    }
}

impl TimerThresholds {
    /// Create thresholds, lifting `warning_ms` to at least `critical_ms`.
    #[must_use]
    pub fn new(warning_ms: u64, critical_ms: u64) -> Self {
        Self {
            warning_ms: warning_ms.max(critical_ms),
            critical_ms,
        }
    }

    /// Classify a remaining-time value.
    #[must_use]
    pub fn classify(
        &self,
        has_round_timer: bool,
        round_time_remaining: u64,
        source: &TimestampSource,
    ) -> TimerStates {
        let remaining = round_time_remaining;
        TimerStates {
            is_paused: source.effective_pause().is_some(),
            is_round_warning: has_round_timer
                && remaining > self.critical_ms
                && remaining <= self.warning_ms,
            is_round_critical: has_round_timer && remaining > 0 && remaining <= self.critical_ms,
            is_round_expired: has_round_timer && remaining == 0,
        }
    }
}

// ============================================================================
// Timer States
// ============================================================================

/// Independent display flags for a round timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerStates {
    /// An authoritative pause timestamp is present.
    pub is_paused: bool,
    /// Remaining time is inside the warning band.
    pub is_round_warning: bool,
    /// Remaining time is inside the critical band.
    pub is_round_critical: bool,
    /// Round budget is spent.
    pub is_round_expired: bool,
}

impl TimerStates {
    /// Collapse the round flags into a single band for display.
    ///
    /// Ignores `is_paused`; `has_round_timer` separates `Idle` from `Running`.
    #[must_use]
    pub fn band(&self, has_round_timer: bool) -> TimerBand {
        if !has_round_timer {
            TimerBand::Idle
        } else if self.is_round_expired {
            TimerBand::Expired
        } else if self.is_round_critical {
            TimerBand::Critical
        } else if self.is_round_warning {
            TimerBand::Warning
        } else {
            TimerBand::Running
        }
    }
}

/// Round timer band, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum TimerBand {
    /// No round timer configured.
    #[default]
    Idle,
    /// Above the warning threshold.
    Running,
    /// Inside the warning band.
    Warning,
    /// Inside the critical band.
    Critical,
    /// No time left.
    Expired,
}

impl TimerBand {
    /// Short label for logs and overlays.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Expired => "expired",
        }
    }
}

/// Classify with the default 15s / 5s thresholds.
#[must_use]
pub fn get_timer_states(
    has_round_timer: bool,
    round_time_remaining: u64,
    source: &TimestampSource,
) -> TimerStates {
    TimerThresholds::default().classify(has_round_timer, round_time_remaining, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{LocalTimestamps, PauseAuthority};
    use encounter_common::from_epoch_millis;
    use proptest::prelude::*;

    fn running() -> TimestampSource {
        TimestampSource::server(Some(from_epoch_millis(0)), None)
    }

    #[test]
    fn test_warning_boundary() {
        let states = get_timer_states(true, 15_000, &running());
        assert!(states.is_round_warning);
        assert!(!states.is_round_critical);
        assert!(!states.is_round_expired);

        let states = get_timer_states(true, 15_001, &running());
        assert!(!states.is_round_warning);
    }

    #[test]
    fn test_critical_boundary() {
        let states = get_timer_states(true, 5_000, &running());
        assert!(states.is_round_critical);
        assert!(!states.is_round_warning);

        let states = get_timer_states(true, 1, &running());
        assert!(states.is_round_critical);
    }

    #[test]
    fn test_expired_at_zero() {
        let states = get_timer_states(true, 0, &running());
        assert!(states.is_round_expired);
        assert!(!states.is_round_warning);
        assert!(!states.is_round_critical);
    }

    #[test]
    fn test_no_round_timer_no_flags() {
        let states = get_timer_states(false, 0, &running());
        assert_eq!(states, TimerStates::default());
        assert_eq!(states.band(false), TimerBand::Idle);
    }

    #[test]
    fn test_paused_and_expired_together() {
        let source = TimestampSource::server(Some(from_epoch_millis(0)), Some(from_epoch_millis(9)));
        let states = get_timer_states(true, 0, &source);
        assert!(states.is_paused);
        assert!(states.is_round_expired);
    }

    #[test]
    fn test_local_only_pause_reflects_local() {
        let server_paused =
            TimestampSource::server(Some(from_epoch_millis(0)), Some(from_epoch_millis(1_000)))
                .with_pause_authority(PauseAuthority::LocalOnly);
        assert!(!get_timer_states(true, 30_000, &server_paused).is_paused);

        let locally_paused = server_paused.with_local(LocalTimestamps {
            started_at: None,
            paused_at: Some(from_epoch_millis(2_000)),
        });
        assert!(get_timer_states(true, 30_000, &locally_paused).is_paused);
    }

    #[test]
    fn test_band_ordering() {
        assert_eq!(get_timer_states(true, 40_000, &running()).band(true), TimerBand::Running);
        assert_eq!(get_timer_states(true, 10_000, &running()).band(true), TimerBand::Warning);
        assert_eq!(get_timer_states(true, 3_000, &running()).band(true), TimerBand::Critical);
        assert_eq!(get_timer_states(true, 0, &running()).band(true), TimerBand::Expired);
        assert!(TimerBand::Critical > TimerBand::Warning);
    }

    #[test]
    fn test_custom_thresholds_keep_order() {
        let thresholds = TimerThresholds::new(2_000, 8_000);
        assert_eq!(thresholds.warning_ms, 8_000);
        let states = thresholds.classify(true, 8_000, &running());
        assert!(states.is_round_critical);
        assert!(!states.is_round_warning);
    }

    proptest! {
        #[test]
        fn prop_round_flags_mutually_exclusive(remaining in 0u64..100_000) {
            let states = get_timer_states(true, remaining, &running());
            let set = [states.is_round_warning, states.is_round_critical, states.is_round_expired]
                .iter()
                .filter(|flag| **flag)
                .count();
            prop_assert!(set <= 1);
        }
    }
}
