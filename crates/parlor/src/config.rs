//! Server configuration.
//!
//! Everything has a default, so a server runs with no file at all. To
//! override, point `PARLOR_CONFIG` at a JSON file; any field it leaves
//! out keeps its default:
//!
//! ```json
//! {
//!   "bind": "127.0.0.1:6000",
//!   "tick_rate_hz": 20,
//!   "room": { "max_nickname_len": 12 }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use parlor_protocol::{BinaryCodec, Codec, DEFAULT_MAX_FRAME_LEN, JsonCodec};
use parlor_room::RoomConfig;
use parlor_tick::{TickConfig, TickPolicy};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Which envelope encoding connections speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// The compact binary wire format clients use.
    #[default]
    Binary,
    /// JSON envelopes, for poking at the server by hand.
    Json,
}

impl CodecKind {
    pub fn build(self) -> Arc<dyn Codec> {
        match self {
            Self::Binary => Arc::new(BinaryCodec),
            Self::Json => Arc::new(JsonCodec),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Listen backlog. Bounds how many connections wait to be accepted.
    pub backlog: u32,
    pub tick_rate_hz: u32,
    /// What the loop does after a tick overran its interval.
    pub tick_policy: TickPolicy,
    pub codec: CodecKind,
    /// Frames announcing more bytes than this close the connection.
    pub max_frame_len: usize,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:55555".to_string(),
            backlog: 50,
            tick_rate_hz: 10,
            tick_policy: TickPolicy::Skip,
            codec: CodecKind::Binary,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Names the config file to load.
    pub const ENV_VAR: &'static str = "PARLOR_CONFIG";

    /// Loads the file named by [`Self::ENV_VAR`], or the defaults if
    /// it's unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(Self::ENV_VAR) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The tick scheduler settings these values imply.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            policy: self.tick_policy,
            ..TickConfig::with_rate(self.tick_rate_hz)
        }
    }

    /// Checks values that parse fine but can't work.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if the tick rate is out of range, the
    /// heartbeat timeout isn't longer than a tick, a limit is zero, or
    /// the lobby geometry can't be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tick = self
            .tick_config()
            .validated()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.room.heartbeat_timeout <= tick.tick_duration() {
            return Err(ConfigError::Invalid(format!(
                "heartbeat timeout {:?} must be longer than one tick ({:?})",
                self.room.heartbeat_timeout,
                tick.tick_duration()
            )));
        }
        if self.backlog == 0 {
            return Err(ConfigError::Invalid("backlog must be at least 1".into()));
        }
        if self.max_frame_len == 0 {
            return Err(ConfigError::Invalid("max_frame_len must be at least 1".into()));
        }
        if self.room.max_nickname_len == 0 {
            return Err(ConfigError::Invalid("max_nickname_len must be at least 1".into()));
        }
        if !self.room.arena.is_well_formed() {
            return Err(ConfigError::Invalid(format!(
                "arena bounds {:?} must be finite with min <= max",
                self.room.arena
            )));
        }
        let radius = self.room.whisper_radius;
        if !radius.is_finite() || radius < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "whisper_radius {radius} must be a finite, non-negative distance"
            )));
        }
        Ok(())
    }
}
