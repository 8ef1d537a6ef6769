//! Session Configuration
//!
//! Settings are read from a JSON file. Every field has a default, so a partial
//! file (or no file at all) is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sample clip used by the demo hosts when no description is given.
pub const SAMPLE_DESCRIPTION: &str =
    "playbin uri=http://mirrors.standaloneinstaller.com/video-sample/jellyfish-25-mbps-hd-hevc.mp4";

/// Settings for a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between position/duration samples
    pub poll_interval_ms: u64,
    /// Upper bound on the state query made while sampling status
    pub state_query_timeout_ms: u64,
    /// How long the bus loop waits for a message before re-checking shutdown
    pub bus_poll_timeout_ms: u64,
    /// Set `force-aspect-ratio` on the video sink when it supports it
    pub force_aspect_ratio: bool,
    /// Let the video sink handle pointer/key events on the surface
    pub handle_overlay_events: bool,
    /// Go straight to Playing after start instead of stopping at Ready
    pub autoplay: bool,
    /// Description used when the host is given none
    pub default_description: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            state_query_timeout_ms: 100,
            bus_poll_timeout_ms: 100,
            force_aspect_ratio: true,
            handle_overlay_events: true,
            autoplay: false,
            default_description: SAMPLE_DESCRIPTION.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn state_query_timeout(&self) -> Duration {
        Duration::from_millis(self.state_query_timeout_ms)
    }

    pub fn bus_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.bus_poll_timeout_ms.max(1))
    }

    /// Load settings from an explicit file. Read and parse errors are returned.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&content)?;
        log::info!("[Config] Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load settings from `path` if given, otherwise from the default location.
    ///
    /// A missing or unreadable default file falls back to defaults; an explicit
    /// path must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let Some(default_path) = default_settings_path() else {
            return Ok(Self::default());
        };

        if !default_path.exists() {
            log::debug!("[Config] No settings at {}, using defaults", default_path.display());
            return Ok(Self::default());
        }

        match Self::from_file(&default_path) {
            Ok(config) => Ok(config),
            Err(e) => {
                log::warn!("[Config] Failed to load {}: {}", default_path.display(), e);
                Ok(Self::default())
            }
        }
    }
}

/// `<config dir>/gst-session/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gst-session").join("settings.json"))
}
