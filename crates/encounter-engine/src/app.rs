//! Scripted demo encounter.
//!
//! Builds an encounter from the configuration, runs it through the encounter
//! service on a tokio interval, and logs what a tracker display would show.

use std::time::Duration;

use anyhow::{Context, Result};
use encounter_combat::{
    CombatState, EncounterEvent, EncounterService, EncounterStore, EventBus, FileStore,
    LocalTimestamps, MemoryStore, TimerBand,
};
use encounter_common::{millis_between, ParticipantId, SessionId};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::ticker::{Clock, ScaledClock, SystemClock, TimerTicker};

/// Simulated length of a turn when no round timer is configured.
const SIMULATED_TURN_MS: u64 = 6_000;

/// Build the initial combat state from the configuration.
pub fn build_encounter(config: &TrackerConfig) -> CombatState {
    let mut state = CombatState::new().with_timer_reset(config.timer_reset);
    state.round_time_limit = config.round_time_limit_ms;
    for participant in &config.demo.participants {
        state.add_participant(participant.to_participant());
    }
    state
}

/// Run the demo encounter to completion.
pub async fn run(config: TrackerConfig) -> Result<()> {
    match config.session_dir.clone() {
        Some(dir) => {
            info!("Storing sessions in {}", dir.display());
            run_with_store(config, FileStore::new(dir)).await
        },
        None => run_with_store(config, MemoryStore::new()).await,
    }
}

async fn run_with_store<S: EncounterStore>(config: TrackerConfig, store: S) -> Result<()> {
    let clock: Box<dyn Clock> = if config.demo.speedup > 1 {
        Box::new(ScaledClock::new(config.demo.speedup))
    } else {
        Box::new(SystemClock)
    };
    let service = EncounterService::new(store)
        .with_event_bus(EventBus::new(config.event_capacity))
        .with_thresholds(config.thresholds());

    let session = service
        .create_session(&build_encounter(&config))
        .context("failed to create encounter session")?;
    let started = service
        .start(session, clock.now())
        .context("failed to start combat")?;

    // This process issues every start and turn change, so it mirrors the
    // resulting timestamps locally instead of waiting on the store.
    let mut ticker = TimerTicker::new(config.pause_authority, config.thresholds());
    ticker.set_local(local_timestamps(&started));
    let mut turn_started = started.started_at.unwrap_or_else(|| clock.now());
    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_interval_ms));

    loop {
        interval.tick().await;
        let now = clock.now();
        let state = service.get(session)?;

        if state.round > config.demo.rounds {
            let ended = service.end(session)?;
            log_events(&service, session);
            let dump = serde_json::to_string(&ended)?;
            debug!(state = %dump, "Final encounter state");
            break;
        }

        let outcome = ticker.tick(&state, now);
        debug!(
            round = outcome.snapshot.round,
            elapsed = %outcome.snapshot.duration_label,
            remaining = %outcome.snapshot.remaining_label,
            band = outcome.snapshot.band.label(),
            "Tick"
        );

        if let Some(transition) = outcome.transition {
            service.events().publish(EncounterEvent::TimerBandChanged {
                session,
                from: transition.from,
                to: transition.to,
            });
        }

        let timed_turns = state.has_round_timer() && config.auto_advance_on_expiry;
        if timed_turns && outcome.just_expired() {
            match service.next_turn(session, now) {
                Ok(updated) => {
                    ticker.set_local(local_timestamps(&updated));
                    turn_started = now;
                },
                Err(e) => warn!("Could not advance turn (status {}): {e}", e.status_code()),
            }
        } else if !timed_turns && millis_between(turn_started, now) >= SIMULATED_TURN_MS {
            // Hand over the turn on a fixed simulated cadence.
            let updated = service.next_turn(session, now)?;
            ticker.set_local(local_timestamps(&updated));
            turn_started = now;
        }

        log_events(&service, session);
    }

    info!(ticks = ticker.ticks(), "Demo encounter finished");
    ticker.reset();
    Ok(())
}

fn local_timestamps(state: &CombatState) -> LocalTimestamps {
    LocalTimestamps {
        started_at: state.started_at,
        paused_at: state.paused_at,
    }
}

fn log_events<S: EncounterStore>(service: &EncounterService<S>, session: SessionId) {
    let state = service.get(session).ok();
    let name_of = |id: ParticipantId| {
        state
            .as_ref()
            .and_then(|s| s.participant(id))
            .map_or_else(|| "-".to_string(), |p| p.name.clone())
    };

    for event in service.events().drain() {
        match event {
            EncounterEvent::CombatStarted { participant, .. } => {
                let first = participant.map_or_else(|| "-".to_string(), name_of);
                info!("Combat started, {first} acts first");
            },
            EncounterEvent::RoundStarted { round, .. } => info!("Round {round} begins"),
            EncounterEvent::TurnAdvanced { participant, round, .. } => {
                let name = participant.map_or_else(|| "-".to_string(), name_of);
                info!(round, "{name}'s turn");
            },
            EncounterEvent::TimerBandChanged { to, .. } if to >= TimerBand::Warning => {
                info!("Round timer {}", to.label());
            },
            EncounterEvent::CombatEnded { rounds, .. } => info!(rounds, "Combat ended"),
            other => debug!(?other, "Event"),
        }
    }
}
