//! Configuration and application directories.
//!
//! Configuration is read from `config.toml` in the config directory, with a
//! default for every field so a missing or partial file always yields a
//! runnable config. A handful of environment variables override individual
//! fields for deployments and tests:
//!
//! - `NOTEPAD_ROOM` — overrides [`BotConfig::room_id`]
//! - `NOTEPAD_DATA_DIR` — overrides [`data_dir`]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Stack Exchange site the chat server belongs to.
    pub host: String,
    /// Chat room to join and watch.
    pub room_id: String,
    /// Report endpoint used by the `show` command.
    pub report_url: String,
    /// Link rendered in report payloads and the easter-egg reply.
    pub project_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            host: "stackoverflow.com".to_owned(),
            room_id: "111347".to_owned(),
            report_url: "https://reports.sobotics.org/api/v2/report/create".to_owned(),
            project_url: "https://github.com/SOBotics/notepad".to_owned(),
        }
    }
}

impl BotConfig {
    /// Load configuration from `config.toml` in the config directory.
    ///
    /// A missing or unparsable file yields the defaults; a `NOTEPAD_ROOM`
    /// environment variable overrides the room in either case.
    pub fn load() -> Self {
        let path = config_dir().join("config.toml");
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!("unparsable config at {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        if let Ok(room) = std::env::var("NOTEPAD_ROOM")
            && !room.trim().is_empty()
        {
            config.room_id = room.trim().to_owned();
        }

        config
    }
}

/// Application data root directory.
///
/// Holds the per-user notepad records and the timer registry. Resolves to
/// `dirs::data_dir()/notepad/` by default; override with `NOTEPAD_DATA_DIR`.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("NOTEPAD_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("notepad"))
        .unwrap_or_else(|| PathBuf::from("/tmp/notepad-data"))
}

/// Application config directory (`config.toml`).
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("NOTEPAD_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("notepad"))
        .unwrap_or_else(|| PathBuf::from("/tmp/notepad-config"))
}
