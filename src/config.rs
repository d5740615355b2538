//! Runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::game::DEFAULT_RETENTION_WINDOW;

/// Default cap on display name length, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 32;

/// Name used when a player joins without one.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Environment variable overriding the retention window, in seconds.
pub const ENV_RETENTION_SECS: &str = "SPINFOUR_RETENTION_SECS";

/// Environment variable overriding the display name cap.
pub const ENV_MAX_NAME_LEN: &str = "SPINFOUR_MAX_NAME_LEN";

/// Game core settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// How long a finished session stays in the table
    #[serde(rename = "retention_secs", with = "duration_secs")]
    pub retention_window: Duration,

    /// Longest accepted display name
    pub max_name_len: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            retention_window: DEFAULT_RETENTION_WINDOW,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl GameConfig {
    /// Defaults overridden by environment variables, where set and valid.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_RETENTION_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.retention_window = Duration::from_secs(secs),
                Err(err) => warn!(key = ENV_RETENTION_SECS, value = %raw, %err, "Ignoring invalid setting"),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_NAME_LEN) {
            match raw.trim().parse::<usize>() {
                Ok(len) if len > 0 => self.max_name_len = len,
                _ => warn!(key = ENV_MAX_NAME_LEN, value = %raw, "Ignoring invalid setting"),
            }
        }
        self
    }

    /// Parse settings from JSON, missing fields taking defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Normalize a client-supplied display name.
    pub fn display_name(&self, raw: &str) -> String {
        let name: String = raw.trim().chars().take(self.max_name_len).collect();
        let name = name.trim_end();
        if name.is_empty() {
            ANONYMOUS_NAME.to_string()
        } else {
            name.to_string()
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
