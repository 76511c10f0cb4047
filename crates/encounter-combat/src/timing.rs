//! Combat duration and round time calculators.
//!
//! Every function here is pure: callers pass the session's timestamps and a
//! fresh "now" and get back whole milliseconds. Nothing is clamped into an
//! error; out-of-range inputs collapse to zero instead.

use encounter_common::{millis_between, Timestamp};
use serde::{Deserialize, Serialize};

// ============================================================================
// Timestamp Source
// ============================================================================

/// Which pause timestamp is authoritative for a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PauseAuthority {
    /// Only the client-observed pause counts; a stale server pause is ignored.
    LocalOnly,
    /// Client-observed pause first, server pause as fallback.
    #[default]
    LocalThenServer,
}

impl PauseAuthority {
    /// Maps the legacy "ignore external pause" flag onto an authority.
    #[must_use]
    pub const fn from_ignore_external(ignore_external_pause: bool) -> Self {
        if ignore_external_pause {
            Self::LocalOnly
        } else {
            Self::LocalThenServer
        }
    }
}

/// Client-observed overrides of the server timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalTimestamps {
    /// Client-observed combat start.
    pub started_at: Option<Timestamp>,
    /// Client-observed pause.
    pub paused_at: Option<Timestamp>,
}

/// Server timestamps, local overrides and the rule that picks between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimestampSource {
    /// Server-authoritative start.
    pub server_started_at: Option<Timestamp>,
    /// Server-authoritative pause.
    pub server_paused_at: Option<Timestamp>,
    /// Client-local overrides.
    pub local: LocalTimestamps,
    /// Pause resolution rule.
    pub pause_authority: PauseAuthority,
}

impl TimestampSource {
    /// Source backed only by server timestamps.
    #[must_use]
    pub fn server(started_at: Option<Timestamp>, paused_at: Option<Timestamp>) -> Self {
        Self {
            server_started_at: started_at,
            server_paused_at: paused_at,
            ..Self::default()
        }
    }

    /// Attach client-local overrides.
    #[must_use]
    pub fn with_local(mut self, local: LocalTimestamps) -> Self {
        self.local = local;
        self
    }

    /// Select the pause resolution rule.
    #[must_use]
    pub fn with_pause_authority(mut self, authority: PauseAuthority) -> Self {
        self.pause_authority = authority;
        self
    }

    /// Local start if present, else server start.
    #[must_use]
    pub fn effective_start(&self) -> Option<Timestamp> {
        self.local.started_at.or(self.server_started_at)
    }

    /// Pause timestamp according to the pause authority.
    #[must_use]
    pub fn effective_pause(&self) -> Option<Timestamp> {
        match self.pause_authority {
            PauseAuthority::LocalOnly => self.local.paused_at,
            PauseAuthority::LocalThenServer => self.local.paused_at.or(self.server_paused_at),
        }
    }
}

// ============================================================================
// Calculators
// ============================================================================

/// Format milliseconds as `M:SS`, flooring to whole seconds.
///
/// # Examples
/// ```
/// use encounter_combat::timing::format_time;
/// assert_eq!(format_time(0), "0:00");
/// assert_eq!(format_time(65_000), "1:05");
/// assert_eq!(format_time(599_000), "9:59");
/// ```
#[must_use]
pub fn format_time(milliseconds: u64) -> String {
    if milliseconds == 0 {
        return "0:00".to_string();
    }
    let total_seconds = milliseconds / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Elapsed combat time in milliseconds.
///
/// Zero when combat is inactive or has no start time. Measures up to the
/// effective pause if there is one, otherwise up to `now`.
#[must_use]
pub fn calculate_combat_duration(
    is_active: bool,
    source: &TimestampSource,
    now: Timestamp,
) -> u64 {
    if !is_active {
        return 0;
    }
    let Some(start) = source.effective_start() else {
        return 0;
    };
    let end = source.effective_pause().unwrap_or(now);
    millis_between(start, end)
}

/// Remaining time in the current round in milliseconds.
///
/// `combat_duration` must come from [`calculate_combat_duration`] over the same
/// session. Returns zero both when no round timer applies and when the round
/// budget is spent; callers tell these apart with `has_round_timer` and the
/// expired flag from the timer state classifier.
#[must_use]
pub fn calculate_round_time_remaining(
    has_round_timer: bool,
    is_active: bool,
    started_at: Option<Timestamp>,
    round_time_limit: Option<u64>,
    combat_duration: u64,
) -> u64 {
    if !has_round_timer || !is_active || started_at.is_none() {
        return 0;
    }
    let Some(limit) = round_time_limit else {
        return 0;
    };
    limit.saturating_sub(combat_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_common::from_epoch_millis;
    use proptest::prelude::*;

    fn at(ms: i64) -> Timestamp {
        from_epoch_millis(ms)
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(65_000), "1:05");
        assert_eq!(format_time(599_000), "9:59");
        assert_eq!(format_time(999), "0:00");
        assert_eq!(format_time(60_000), "1:00");
        assert_eq!(format_time(3_725_400), "62:05");
    }

    #[test]
    fn test_duration_inactive_is_zero() {
        let source = TimestampSource::server(Some(at(0)), None);
        assert_eq!(calculate_combat_duration(false, &source, at(50_000)), 0);
    }

    #[test]
    fn test_duration_without_start_is_zero() {
        let source = TimestampSource::server(None, Some(at(5_000)));
        assert_eq!(calculate_combat_duration(true, &source, at(50_000)), 0);
    }

    #[test]
    fn test_duration_running() {
        let source = TimestampSource::server(Some(at(1_000)), None);
        assert_eq!(calculate_combat_duration(true, &source, at(17_000)), 16_000);
    }

    #[test]
    fn test_duration_stops_at_server_pause() {
        let source = TimestampSource::server(Some(at(0)), Some(at(8_000)));
        assert_eq!(calculate_combat_duration(true, &source, at(30_000)), 8_000);
    }

    #[test]
    fn test_local_start_overrides_server_start() {
        let source = TimestampSource::server(Some(at(0)), None).with_local(LocalTimestamps {
            started_at: Some(at(4_000)),
            paused_at: None,
        });
        assert_eq!(calculate_combat_duration(true, &source, at(10_000)), 6_000);
    }

    #[test]
    fn test_local_only_ignores_server_pause() {
        let source = TimestampSource::server(Some(at(0)), Some(at(2_000)))
            .with_pause_authority(PauseAuthority::LocalOnly);
        assert_eq!(calculate_combat_duration(true, &source, at(10_000)), 10_000);
    }

    #[test]
    fn test_local_then_server_prefers_local_pause() {
        let source = TimestampSource::server(Some(at(0)), Some(at(2_000))).with_local(
            LocalTimestamps {
                started_at: None,
                paused_at: Some(at(3_000)),
            },
        );
        assert_eq!(calculate_combat_duration(true, &source, at(10_000)), 3_000);
    }

    #[test]
    fn test_duration_clock_skew_clamps() {
        let source = TimestampSource::server(Some(at(20_000)), None);
        assert_eq!(calculate_combat_duration(true, &source, at(5_000)), 0);
    }

    #[test]
    fn test_pause_authority_from_flag() {
        assert_eq!(
            PauseAuthority::from_ignore_external(true),
            PauseAuthority::LocalOnly
        );
        assert_eq!(
            PauseAuthority::from_ignore_external(false),
            PauseAuthority::LocalThenServer
        );
    }

    #[test]
    fn test_round_remaining_short_circuits() {
        let start = Some(at(0));
        assert_eq!(calculate_round_time_remaining(false, true, start, Some(60_000), 1_000), 0);
        assert_eq!(calculate_round_time_remaining(true, false, start, Some(60_000), 1_000), 0);
        assert_eq!(calculate_round_time_remaining(true, true, None, Some(60_000), 1_000), 0);
        assert_eq!(calculate_round_time_remaining(true, true, start, None, 1_000), 0);
    }

    #[test]
    fn test_round_remaining_clamped() {
        assert_eq!(
            calculate_round_time_remaining(true, true, Some(at(0)), Some(60_000), 75_000),
            0
        );
        assert_eq!(
            calculate_round_time_remaining(true, true, Some(at(0)), Some(60_000), 45_000),
            15_000
        );
    }

    proptest! {
        #[test]
        fn prop_inactive_duration_always_zero(
            start in proptest::option::of(0i64..1_000_000),
            local_start in proptest::option::of(0i64..1_000_000),
            pause in proptest::option::of(0i64..1_000_000),
            local_pause in proptest::option::of(0i64..1_000_000),
            ignore in any::<bool>(),
            now in 0i64..2_000_000,
        ) {
            let source = TimestampSource::server(start.map(at), pause.map(at))
                .with_local(LocalTimestamps {
                    started_at: local_start.map(at),
                    paused_at: local_pause.map(at),
                })
                .with_pause_authority(PauseAuthority::from_ignore_external(ignore));
            prop_assert_eq!(calculate_combat_duration(false, &source, at(now)), 0);
        }

        #[test]
        fn prop_duration_never_exceeds_span(start in 0i64..1_000_000, now in 0i64..1_000_000) {
            let source = TimestampSource::server(Some(at(start)), None);
            let duration = calculate_combat_duration(true, &source, at(now));
            let expected = u64::try_from(now - start).unwrap_or(0);
            prop_assert_eq!(duration, expected);
        }
    }
}
