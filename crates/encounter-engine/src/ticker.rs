//! Round timer polling.
//!
//! The calculators are pure, so the display side polls them: every tick reads
//! a fresh "now" from a [`Clock`], captures a [`TimerSnapshot`] and compares it
//! with the previous tick to detect band changes.

use std::time::Instant;

use chrono::Utc;
use encounter_combat::{
    CombatState, LocalTimestamps, PauseAuthority, TimerBand, TimerSnapshot, TimerThresholds,
    TimerTransition,
};
use encounter_common::{add_millis, Timestamp};
use tracing::debug;

/// Source of wall-clock time for the timer loop.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Wall-clock time running `speedup` times faster than real time.
#[derive(Debug, Clone, Copy)]
pub struct ScaledClock {
    /// Simulated time at creation.
    origin: Timestamp,
    /// Real instant at creation.
    reference: Instant,
    /// Simulated milliseconds per real millisecond.
    speedup: u32,
}

impl ScaledClock {
    /// Start a scaled clock at the current wall-clock time.
    #[must_use]
    pub fn new(speedup: u32) -> Self {
        Self {
            origin: Utc::now(),
            reference: Instant::now(),
            speedup: speedup.max(1),
        }
    }
}

impl Clock for ScaledClock {
    fn now(&self) -> Timestamp {
        let real_ms = u64::try_from(self.reference.elapsed().as_millis()).unwrap_or(u64::MAX);
        add_millis(self.origin, real_ms.saturating_mul(u64::from(self.speedup)))
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Snapshot for this tick.
    pub snapshot: TimerSnapshot,
    /// Band change since the previous tick.
    pub transition: Option<TimerTransition>,
}

impl TickOutcome {
    /// The round budget ran out on this tick.
    #[must_use]
    pub fn just_expired(&self) -> bool {
        self.transition
            .is_some_and(|t| t.to == TimerBand::Expired && t.from != TimerBand::Expired)
    }
}

/// Polls the calculators for one session.
#[derive(Debug)]
pub struct TimerTicker {
    /// Client-local timestamp overrides.
    local: LocalTimestamps,
    /// Pause resolution rule.
    authority: PauseAuthority,
    /// Band thresholds.
    thresholds: TimerThresholds,
    /// Snapshot from the previous tick.
    previous: Option<TimerSnapshot>,
    /// Ticks since creation or reset.
    ticks: u64,
}

impl TimerTicker {
    /// Create a ticker.
    #[must_use]
    pub fn new(authority: PauseAuthority, thresholds: TimerThresholds) -> Self {
        Self {
            local: LocalTimestamps::default(),
            authority,
            thresholds,
            previous: None,
            ticks: 0,
        }
    }

    /// Replace the client-local overrides.
    pub fn set_local(&mut self, local: LocalTimestamps) {
        self.local = local;
    }

    /// Capture a snapshot and report any band change.
    ///
    /// The first tick reports a transition from `Idle` when a round timer is
    /// already running.
    pub fn tick(&mut self, state: &CombatState, now: Timestamp) -> TickOutcome {
        let snapshot =
            TimerSnapshot::capture(state, &self.local, self.authority, &self.thresholds, now);
        let transition = match &self.previous {
            Some(previous) => snapshot.transition_from(previous),
            None if snapshot.band != TimerBand::Idle => Some(TimerTransition {
                from: TimerBand::Idle,
                to: snapshot.band,
            }),
            None => None,
        };

        if let Some(t) = transition {
            debug!(from = t.from.label(), to = t.to.label(), "Timer band changed");
        }

        self.previous = Some(snapshot.clone());
        self.ticks += 1;
        TickOutcome {
            snapshot,
            transition,
        }
    }

    /// Number of ticks since creation or reset.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Forget the previous snapshot (call after combat ends).
    pub fn reset(&mut self) {
        self.previous = None;
        self.ticks = 0;
    }
}
