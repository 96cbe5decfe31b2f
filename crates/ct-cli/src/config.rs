//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use ct_core::TimerConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Running snapshots older than this resume paused.
    pub staleness_secs: i64,

    /// Overtime grace before the white card.
    pub white_grace_secs: i64,

    /// Whether the white card is shown at all.
    pub white_card: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("staleness_secs", &self.staleness_secs)
            .field("white_grace_secs", &self.white_grace_secs)
            .field("white_card", &self.white_card)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let timer = TimerConfig::default();
        Self {
            database_path: data_dir.join("ct.db"),
            staleness_secs: timer.staleness_secs,
            white_grace_secs: timer.white_grace_secs.unwrap_or_default(),
            white_card: timer.white_grace_secs.is_some(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CT_*)
        figment = figment.merge(Env::prefixed("CT_"));

        figment.extract()
    }

    /// Timer tunables derived from this configuration.
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            staleness_secs: self.staleness_secs,
            white_grace_secs: self.white_card.then_some(self.white_grace_secs),
        }
    }
}

/// Returns the platform-specific config directory for ct.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ct"))
}

/// Returns the platform-specific data directory for ct.
///
/// On Linux: `~/.local/share/ct`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ct"))
}
