use crate::capture::{LoopConfig, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY};
use crate::engine::MatchSettings;
use anyhow::{Context, Result};
use rollcall_core::{Cutoff, DEFAULT_MATCH_THRESHOLD};
use rollcall_store::DEFAULT_STAFF_PREFIX;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Daemon configuration: defaults, then an optional TOML file, then
/// `ROLLCALL_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Maximum Euclidean distance for a positive match.
    pub match_threshold: f32,
    /// Punctuality cutoff (HH:MM).
    pub cutoff: Cutoff,
    /// How often the capture loop checks whether to start an attempt.
    pub poll_interval: Duration,
    /// Minimum spacing between recognition attempts.
    pub settle_delay: Duration,
    /// Probe feed path; `None` reads stdin.
    pub feed: Option<PathBuf>,
    /// Prefix for newly assigned staff codes.
    pub staff_prefix: String,
}

/// On-disk configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub match_threshold: Option<f32>,
    pub cutoff: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub feed: Option<PathBuf>,
    pub staff_prefix: Option<String>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();

        let explicit = env("ROLLCALL_CONFIG").map(PathBuf::from);
        let file = match explicit {
            Some(path) => Some(FileConfig::read(&path)?),
            None => {
                let default = config_home().join("rollcall/config.toml");
                if default.exists() {
                    Some(FileConfig::read(&default)?)
                } else {
                    None
                }
            }
        };

        Ok(Self::from_sources(file.unwrap_or_default(), env))
    }

    /// Merge a parsed file with an environment lookup. Environment wins.
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = env("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or_else(|| data_home(&env).join("rollcall/attendance.db"));

        let match_threshold = parsed(&env, "ROLLCALL_MATCH_THRESHOLD")
            .or(file.match_threshold)
            .filter(|t: &f32| {
                let ok = t.is_finite() && *t > 0.0;
                if !ok {
                    tracing::warn!(threshold = t, "ignoring non-positive match threshold");
                }
                ok
            })
            .unwrap_or(DEFAULT_MATCH_THRESHOLD);

        let cutoff = match env("ROLLCALL_CUTOFF").or(file.cutoff) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "bad cutoff; using default {}", Cutoff::default());
                Cutoff::default()
            }),
            None => Cutoff::default(),
        };

        let poll_interval = parsed(&env, "ROLLCALL_POLL_INTERVAL_MS")
            .or(file.poll_interval_ms)
            .map(|ms: u64| Duration::from_millis(ms.max(1)))
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let settle_delay = parsed(&env, "ROLLCALL_SETTLE_DELAY_MS")
            .or(file.settle_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SETTLE_DELAY);

        let feed = match env("ROLLCALL_FEED").map(PathBuf::from).or(file.feed) {
            Some(p) if p.as_os_str() == "-" => None,
            other => other,
        };

        let staff_prefix = env("ROLLCALL_STAFF_PREFIX")
            .or(file.staff_prefix)
            .unwrap_or_else(|| DEFAULT_STAFF_PREFIX.to_string());

        Self {
            db_path,
            match_threshold,
            cutoff,
            poll_interval,
            settle_delay,
            feed,
            staff_prefix,
        }
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            threshold: self.match_threshold,
            cutoff: self.cutoff,
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            poll_interval: self.poll_interval,
            settle_delay: self.settle_delay,
        }
    }
}

fn parsed<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

fn home() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

fn config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".config"))
}

fn data_home(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home().join(".local/share"))
}
