//! Configuration for Pledge runtimes.
//!
//! ```toml
//! [runtime]
//! task_budget = 100000
//!
//! [diagnostics]
//! enabled = true
//! level = "warn"
//! ```
//!
//! Every section and field is optional.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

/// Overrides the default config location when set.
pub const CONFIG_ENV_VAR: &str = "PLEDGE_CONFIG";

/// Tasks a single drive may run when no budget is configured.
pub const DEFAULT_TASK_BUDGET: usize = 1_000_000;

// Default value functions for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

const fn default_task_budget() -> usize {
    DEFAULT_TASK_BUDGET
}

#[derive(Debug, Default, Deserialize)]
pub struct PledgeConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Event loop limits.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Most tasks a single run may execute before giving up. Guards against
    /// tasks that keep rescheduling themselves. Default: 1,000,000.
    #[serde(default = "default_task_budget")]
    pub task_budget: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            task_budget: DEFAULT_TASK_BUDGET,
        }
    }
}

/// Where handler failures are reported.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Log handler failures. Default: true.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level for handler failures. Default: "warn".
    #[serde(default)]
    pub level: ReportLevel,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: ReportLevel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl ReportLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    pub const fn as_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl PledgeConfig {
    /// Load from `$PLEDGE_CONFIG` or the default location. `Ok(None)` when no
    /// config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = resolve_path(env::var_os(CONFIG_ENV_VAR)) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::parse(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pledge").join("config.toml"))
}

fn resolve_path(override_path: Option<OsString>) -> Option<PathBuf> {
    match override_path {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => config_path(),
    }
}
