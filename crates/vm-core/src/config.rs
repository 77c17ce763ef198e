//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, auth, consolidation rules, and the periodic
//! scheduler. Every section defaults sensibly so a completely empty `{}` file
//! is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub merge: MergeConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.auth.enabled && self.auth.api_key.as_deref().map_or(true, str::is_empty) {
            warnings.push("auth is enabled but no api_key is set; every request will be rejected".into());
        }

        if self.merge.provider.trim().is_empty() {
            warnings.push("merge.provider is empty; movies can only be matched by title".into());
        }

        if self.merge.concurrency == 0 {
            warnings.push("merge.concurrency is 0; groups will be processed one at a time".into());
        }

        for (i, loc) in self.merge.locations_excluded.iter().enumerate() {
            if loc.as_os_str().is_empty() {
                warnings.push(format!("merge.locations_excluded[{i}] is empty"));
            } else if loc.is_relative() {
                warnings.push(format!(
                    "merge.locations_excluded[{i}] '{}' is relative and will never match a catalog path",
                    loc.display()
                ));
            }
        }

        if self.schedule.enabled && self.schedule.interval_hours == 0 {
            warnings.push("schedule.interval_hours is 0; the scheduler will not run".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8096,
            db_path: PathBuf::from("/data/versionmerge.db"),
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
}

/// Rules that decide which items are eligible and how movies are matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Path prefixes whose items are never merged or split. Empty means
    /// exclude nothing.
    pub locations_excluded: Vec<PathBuf>,
    /// Provider whose external id identifies a movie (e.g. `"Tmdb"`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Group movies lacking a provider id by `(title, year)` instead of
    /// skipping them.
    pub match_movies_by_title: bool,
    /// Maximum number of groups reconciled at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_provider() -> String {
    "Tmdb".into()
}

fn default_concurrency() -> usize {
    4
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            locations_excluded: Vec::new(),
            provider: default_provider(),
            match_movies_by_title: false,
            concurrency: default_concurrency(),
        }
    }
}

impl MergeConfig {
    /// True if `path` lies under any configured excluded prefix.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.locations_excluded
            .iter()
            .filter(|prefix| !prefix.as_os_str().is_empty())
            .any(|prefix| path.starts_with(prefix))
    }
}

/// Periodic consolidation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    #[serde(default = "default_true")]
    pub merge_movies: bool,
    #[serde(default = "default_true")]
    pub merge_episodes: bool,
}

fn default_interval_hours() -> u64 {
    24
}

fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: default_interval_hours(),
            merge_movies: true,
            merge_episodes: true,
        }
    }
}
