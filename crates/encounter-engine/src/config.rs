//! Tracker configuration.
//!
//! Timer loop, round timer and demo encounter settings. Configuration can be
//! loaded from and saved to a TOML file.

use encounter_combat::{
    Participant, ParticipantKind, PauseAuthority, TimerReset, TimerThresholds,
    CRITICAL_THRESHOLD_MS, WARNING_THRESHOLD_MS,
};
use encounter_common::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "encounter-tracker.toml";

/// Tracker configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // === Logging ===
    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,

    // === Timer Loop ===
    /// Milliseconds between timer ticks
    pub tick_interval_ms: u64,
    /// Capacity of the event bus
    pub event_capacity: usize,

    // === Round Timer ===
    /// Per-round budget in milliseconds (None = no round timer)
    pub round_time_limit_ms: Option<u64>,
    /// When turn advancement restarts the round timer
    pub timer_reset: TimerReset,
    /// Remaining time that enters the warning band
    pub warning_threshold_ms: u64,
    /// Remaining time that enters the critical band
    pub critical_threshold_ms: u64,
    /// Which pause timestamp the display trusts
    pub pause_authority: PauseAuthority,
    /// Advance the turn automatically when the round timer expires
    pub auto_advance_on_expiry: bool,

    // === Storage ===
    /// Directory for session files (None = keep sessions in memory)
    pub session_dir: Option<PathBuf>,

    // === Demo Encounter ===
    /// Scripted encounter run by the binary
    pub demo: DemoConfig,
}

/// Scripted encounter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Participants in the encounter
    pub participants: Vec<DemoParticipant>,
    /// Stop after this many rounds
    pub rounds: u32,
    /// Simulated milliseconds per real millisecond
    pub speedup: u32,
}

/// One participant of the demo encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoParticipant {
    /// Display name
    pub name: String,
    /// Creature kind
    #[serde(default)]
    pub kind: ParticipantKind,
    /// Initiative roll
    pub initiative: i32,
    /// Initiative tiebreaker
    #[serde(default)]
    pub dexterity_modifier: i32,
    /// Maximum hit points
    #[serde(default)]
    pub max_hp: Option<i32>,
}

impl DemoParticipant {
    fn new(name: &str, kind: ParticipantKind, initiative: i32, dexterity_modifier: i32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            initiative,
            dexterity_modifier,
            max_hp: None,
        }
    }

    /// Build the engine participant.
    #[must_use]
    pub fn to_participant(&self) -> Participant {
        let participant = Participant::new(self.name.clone(), self.kind, self.initiative)
            .with_dexterity_modifier(self.dexterity_modifier);
        match self.max_hp {
            Some(hp) => participant.with_hit_points(hp),
            None => participant,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            participants: vec![
                DemoParticipant::new("Thalia", ParticipantKind::Player, 18, 3),
                DemoParticipant::new("Brother Orin", ParticipantKind::Player, 11, 0),
                DemoParticipant::new("Goblin Boss", ParticipantKind::Monster, 14, 2),
                DemoParticipant::new("Goblin", ParticipantKind::Monster, 14, 1),
            ],
            rounds: 2,
            speedup: 20,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_filter: "encounter=info".to_string(),

            // Timer loop
            tick_interval_ms: 250,
            event_capacity: 1024,

            // Round timer
            round_time_limit_ms: Some(20_000),
            timer_reset: TimerReset::EveryTurn,
            warning_threshold_ms: WARNING_THRESHOLD_MS,
            critical_threshold_ms: CRITICAL_THRESHOLD_MS,
            pause_authority: PauseAuthority::LocalThenServer,
            auto_advance_on_expiry: true,

            session_dir: None,

            demo: DemoConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Load and validate configuration from a specific path.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> TrackerResult<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&contents).map_err(|e| TrackerError::Serialization(e.to_string()))?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> TrackerResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| TrackerError::Serialization(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("encounter-tracker").join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
        self.tick_interval_ms = self.tick_interval_ms.clamp(16, 5_000);
        self.event_capacity = self.event_capacity.clamp(16, 65_536);

        if self.round_time_limit_ms == Some(0) {
            self.round_time_limit_ms = None;
        }
        self.critical_threshold_ms = self.critical_threshold_ms.min(60_000);
        self.warning_threshold_ms = self.warning_threshold_ms.max(self.critical_threshold_ms);

        self.demo.rounds = self.demo.rounds.clamp(1, 100);
        self.demo.speedup = self.demo.speedup.clamp(1, 1_000);
    }

    /// Timer thresholds for the classifier.
    #[must_use]
    pub fn thresholds(&self) -> TimerThresholds {
        TimerThresholds::new(self.warning_threshold_ms, self.critical_threshold_ms)
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
