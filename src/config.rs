use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    grid::GridGeometry,
    timer::DEFAULT_MINUTES,
    watcher::poll_period,
};

/// Runtime configuration. Every field has a default, so a partial JSON file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub settings_file: String,
    /// Countdown step.
    pub tick_millis: u64,
    /// Planned-block watcher period, clamped to 1..=30 seconds.
    pub watcher_poll_secs: u64,
    /// How often the grid's notion of "now" is refreshed.
    pub clock_refresh_secs: u64,
    pub default_minutes: u32,
    pub cell_height: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("zenfocus-data"),
            database_file: "zenfocus.sqlite3".into(),
            settings_file: "settings.json".into(),
            tick_millis: 1000,
            watcher_poll_secs: 10,
            clock_refresh_secs: 30,
            default_minutes: DEFAULT_MINUTES,
            cell_height: crate::grid::projector::DEFAULT_CELL_HEIGHT,
        }
    }
}

impl AppConfig {
    /// Read `path` if it exists, otherwise use defaults.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Defaults overlaid with `ZENFOCUS_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("ZENFOCUS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("ZENFOCUS_WATCH_SECS").and_then(|v| v.parse().ok()) {
            self.watcher_poll_secs = secs;
        }
        let debug_mode = lookup("ZENFOCUS_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.watcher_poll_secs = 1;
        }
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(&self.settings_file)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }

    pub fn watcher_period(&self) -> Duration {
        poll_period(self.watcher_poll_secs)
    }

    pub fn clock_refresh(&self) -> Duration {
        Duration::from_secs(self.clock_refresh_secs.max(1))
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.cell_height)
    }
}
