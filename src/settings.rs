//! Operational settings for the joke teller.
//!
//! Settings start from defaults, are overlaid from a JSON file at startup and
//! then by command-line overrides. Keys are applied through an explicit
//! allow-list: unknown keys are ignored, and a key whose value cannot be
//! coerced to the field's type keeps its default.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

pub const DEFAULT_SETTINGS_FILE: &str = "joke_config.json";
pub const HISTORY_FILE: &str = "jokes_history.json";

const MIB: u64 = 1024 * 1024;
const DEFAULT_DELAY_SECONDS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "wav" => Some(Self::Wav),
            "ogg" => Some(Self::Ogg),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warn),
            "ERROR" | "CRITICAL" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.directive().to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub item_count: usize,
    pub delay_seconds: f64,
    pub language: String,
    pub audio_enabled: bool,
    pub persist_audio: bool,
    pub audio_format: AudioFormat,
    pub log_level: LogLevel,
    pub max_log_size_bytes: u64,
    pub log_backup_count: usize,
    pub categories: BTreeSet<String>,
    pub output_dir: PathBuf,
    pub settings_path: PathBuf,
}

fn default_categories() -> BTreeSet<String> {
    ["neutral", "chuck", "all"].into_iter().map(String::from).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            item_count: 10,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            language: "en".into(),
            audio_enabled: true,
            persist_audio: true,
            audio_format: AudioFormat::Mp3,
            log_level: LogLevel::Info,
            max_log_size_bytes: 10 * MIB,
            log_backup_count: 5,
            categories: default_categories(),
            output_dir: PathBuf::from("jokes_output"),
            settings_path: PathBuf::from(DEFAULT_SETTINGS_FILE),
        }
    }
}

/// Outcome of overlaying one settings file.
#[derive(Debug, Default, PartialEq)]
pub struct OverlayReport {
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
    pub rejected: Vec<(String, String)>,
}

/// Command-line overrides layered on top of the file settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub no_audio: bool,
    pub count: Option<usize>,
    pub save_on_exit: bool,
}

impl Settings {
    /// Resolve the settings file to use.
    ///
    /// An explicit path wins. Otherwise the first existing file among:
    /// 1. ./joke_config.json
    /// 2. ~/.config/joke-teller/joke_config.json
    ///
    /// falling back to ./joke_config.json when neither exists.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        let candidates = [
            std::env::current_dir()
                .ok()
                .map(|d| d.join(DEFAULT_SETTINGS_FILE)),
            dirs::home_dir().map(|h| h.join(".config/joke-teller").join(DEFAULT_SETTINGS_FILE)),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|p| p.exists())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    /// Defaults overlaid with the file at `path`. Never fails: a missing file
    /// is not an error, and an unreadable one is logged and leaves defaults.
    pub fn load(path: &Path) -> Self {
        let mut settings = Self {
            settings_path: path.to_path_buf(),
            ..Self::default()
        };

        if !path.exists() {
            info!("No settings file at {}, using defaults", path.display());
            return settings;
        }

        match settings.overlay_file(path) {
            Ok(report) => {
                for (key, reason) in &report.rejected {
                    warn!("Ignoring settings key '{key}': {reason}");
                }
                if !report.ignored.is_empty() {
                    debug!("Unknown settings keys ignored: {:?}", report.ignored);
                }
                info!(
                    "Loaded settings from {} ({} keys applied)",
                    path.display(),
                    report.applied.len()
                );
            }
            Err(e) => warn!("{e}, using defaults"),
        }
        settings
    }

    /// Apply every known, well-typed key of the JSON object at `path`.
    pub fn overlay_file(&mut self, path: &Path) -> Result<OverlayReport> {
        let unreadable = |reason: String| AppError::ConfigUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let contents = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| unreadable(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(unreadable("top-level value is not an object".into()));
        };

        Ok(self.overlay(&map))
    }

    /// Apply a parsed JSON object key by key. Partial application is allowed.
    pub fn overlay(&mut self, map: &Map<String, Value>) -> OverlayReport {
        let mut report = OverlayReport::default();
        for (key, value) in map {
            match self.apply_field(key, value) {
                Ok(true) => report.applied.push(key.clone()),
                Ok(false) => report.ignored.push(key.clone()),
                Err(reason) => report.rejected.push((key.clone(), reason)),
            }
        }
        report
    }

    /// Allow-listed setter table. `Ok(false)` means the key is unknown.
    fn apply_field(&mut self, key: &str, value: &Value) -> std::result::Result<bool, String> {
        match key {
            "item_count" | "joke_count" => self.item_count = as_count(value)?,
            "delay_seconds" => {
                let delay = as_f64(value)?;
                Duration::try_from_secs_f64(delay)
                    .map_err(|e| format!("expected a non-negative number of seconds, got {value}: {e}"))?;
                self.delay_seconds = delay;
            }
            "language" => {
                let language = as_str(value)?.trim();
                if language.is_empty() {
                    return Err("language code is empty".into());
                }
                self.language = language.to_string();
            }
            "audio_enabled" => self.audio_enabled = as_bool(value)?,
            "persist_audio" | "save_audio" => self.persist_audio = as_bool(value)?,
            "audio_format" => {
                let raw = as_str(value)?;
                self.audio_format =
                    AudioFormat::parse(raw).ok_or_else(|| format!("unknown audio format '{raw}'"))?;
            }
            "log_level" => {
                let raw = as_str(value)?;
                self.log_level =
                    LogLevel::parse(raw).ok_or_else(|| format!("unknown log level '{raw}'"))?;
            }
            "max_log_size_bytes" => self.max_log_size_bytes = as_u64(value)?,
            "max_file_size_mb" => {
                self.max_log_size_bytes = as_u64(value)?
                    .checked_mul(MIB)
                    .ok_or_else(|| format!("{value} MiB is out of range"))?;
            }
            "log_backup_count" | "backup_count" => self.log_backup_count = as_count(value)?,
            "categories" => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("expected a list of strings, got {value}"))?;
                let categories = items
                    .iter()
                    .map(|v| as_str(v).map(|s| s.trim().to_string()))
                    .collect::<std::result::Result<BTreeSet<_>, _>>()?;
                if categories.iter().all(String::is_empty) {
                    return Err("category list is empty".into());
                }
                self.categories = categories.into_iter().filter(|c| !c.is_empty()).collect();
            }
            "output_dir" => self.output_dir = PathBuf::from(as_str(value)?),
            "settings_path" | "config_file" => self.settings_path = PathBuf::from(as_str(value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Layer command-line overrides on top of the file settings.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if overrides.no_audio {
            self.audio_enabled = false;
        }
    }

    /// Write every field as a JSON object. Logs and returns false on failure.
    pub fn save(&self, path: &Path) -> bool {
        match self.write_to(path) {
            Ok(()) => {
                info!("Settings saved to {}", path.display());
                true
            }
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let write_failed = |source: std::io::Error| AppError::ConfigWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_failed(std::io::Error::other(e)))?;
        fs::write(path, json).map_err(write_failed)
    }

    /// Pause between jokes. Falls back to the default when `delay_seconds`
    /// was set to something a `Duration` cannot hold.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or_else(|e| {
            warn!("Invalid delay_seconds {}: {e}, using {DEFAULT_DELAY_SECONDS}", self.delay_seconds);
            Duration::from_secs_f64(DEFAULT_DELAY_SECONDS)
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join(HISTORY_FILE)
    }

    /// `key: value` lines for every field, in declaration order.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("item_count: {}", self.item_count),
            format!("delay_seconds: {}", self.delay_seconds),
            format!("language: {}", self.language),
            format!("audio_enabled: {}", self.audio_enabled),
            format!("persist_audio: {}", self.persist_audio),
            format!("audio_format: {}", self.audio_format),
            format!("log_level: {}", self.log_level),
            format!("max_log_size_bytes: {}", self.max_log_size_bytes),
            format!("log_backup_count: {}", self.log_backup_count),
            format!(
                "categories: {}",
                self.categories.iter().cloned().collect::<Vec<_>>().join(", ")
            ),
            format!("output_dir: {}", self.output_dir.display()),
            format!("settings_path: {}", self.settings_path.display()),
        ]
    }
}

fn as_u64(value: &Value) -> std::result::Result<u64, String> {
    value
        .as_u64()
        .ok_or_else(|| format!("expected a non-negative integer, got {value}"))
}

fn as_count(value: &Value) -> std::result::Result<usize, String> {
    usize::try_from(as_u64(value)?).map_err(|e| e.to_string())
}

fn as_f64(value: &Value) -> std::result::Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected a number, got {value}"))
}

fn as_bool(value: &Value) -> std::result::Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("expected true or false, got {value}"))
}

fn as_str(value: &Value) -> std::result::Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {value}"))
}
