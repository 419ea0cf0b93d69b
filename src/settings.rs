use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const TEMPERATURE_MIN: f64 = 0.0;
pub const TEMPERATURE_MAX: f64 = 2.0;

/// Rendering format for interaction log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Markdown,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "markdown" => Some(LogFormat::Markdown),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Markdown => "md",
            LogFormat::Json => "jsonl",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Markdown => write!(f, "markdown"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Validation failure after all configuration layers are merged.
///
/// A validation failure aborts the run; it is never silently replaced with
/// defaults (a corrupt config *file* falls back to defaults, but an invalid
/// merged value, e.g. from a CLI flag, is surfaced to the user).
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("temperature {0} is outside the valid range {TEMPERATURE_MIN} to {TEMPERATURE_MAX}")]
    TemperatureOutOfRange(f64),

    #[error("log_retention_days must be at least 1")]
    RetentionTooShort,

    #[error("model '{model}' is not in the allowed model list ({allowed})")]
    ModelNotAllowed { model: String, allowed: String },
}

/// CLI-level overrides, applied last (highest precedence).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub no_log: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_log_enabled")]
    pub log_enabled: bool,

    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Models accepted by validation. An empty list disables the check.
    #[serde(default = "default_model_allow_list")]
    pub model_allow_list: Vec<String>,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_retention_days() -> u32 {
    30
}

fn default_log_format() -> LogFormat {
    LogFormat::Markdown
}

fn default_model_allow_list() -> Vec<String> {
    [
        "gpt-3.5-turbo",
        "gpt-4",
        "gpt-4-turbo",
        "gpt-4o",
        "gpt-4o-mini",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            model: default_model(),
            temperature: default_temperature(),
            log_enabled: default_log_enabled(),
            log_retention_days: default_log_retention_days(),
            log_format: default_log_format(),
            model_allow_list: default_model_allow_list(),
        }
    }
}

/// Snapshot of the process environment, for passing to [`Settings::resolve`].
pub fn env_snapshot() -> HashMap<String, String> {
    std::env::vars().collect()
}

impl Settings {
    /// Merge the four configuration layers and validate the result.
    ///
    /// Precedence per field: CLI override > environment variable > config
    /// file > built-in default. Partial overrides at any layer are legal.
    /// The environment is taken as an explicit snapshot so resolution is
    /// pure with respect to its inputs.
    pub fn resolve(
        path: &Path,
        env: &HashMap<String, String>,
        overrides: &Overrides,
    ) -> Result<Self, SettingsError> {
        let mut settings = Self::load_file_layer(path);
        settings.apply_env(env);
        settings.apply_overrides(overrides);
        settings.validate()?;
        Ok(settings)
    }

    /// File layer: a missing file is not an error, and a corrupt file falls
    /// back to defaults wholesale rather than applying a partial parse.
    fn load_file_layer(path: &Path) -> Self {
        if !path.is_file() {
            return Settings::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), "Could not read config file, using defaults: {err}");
                return Settings::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), "Error parsing config file, using defaults: {err}");
                Settings::default()
            }
        }
    }

    /// Environment layer (`GPTCLIP_*`, one variable per field).
    ///
    /// A variable that fails to coerce to the field's type is skipped so the
    /// next-lower layer's value stays in effect.
    fn apply_env(&mut self, env: &HashMap<String, String>) {
        if let Some(v) = env.get("GPTCLIP_SYSTEM_PROMPT") {
            self.system_prompt = v.clone();
        }
        if let Some(v) = env.get("GPTCLIP_MODEL") {
            self.model = v.clone();
        }
        if let Some(v) = env.get("GPTCLIP_TEMPERATURE") {
            if let Ok(t) = v.parse::<f64>() {
                self.temperature = t;
            }
        }
        if let Some(v) = env.get("GPTCLIP_LOG_ENABLED") {
            self.log_enabled = parse_bool(v);
        }
        if let Some(v) = env.get("GPTCLIP_LOG_RETENTION_DAYS") {
            if let Ok(days) = v.parse::<u32>() {
                self.log_retention_days = days;
            }
        }
        if let Some(v) = env.get("GPTCLIP_LOG_FORMAT") {
            if let Some(format) = LogFormat::parse(v) {
                self.log_format = format;
            }
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(ref model) = overrides.model {
            self.model = model.clone();
        }
        if let Some(ref prompt) = overrides.system_prompt {
            self.system_prompt = prompt.clone();
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if overrides.no_log {
            self.log_enabled = false;
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !(TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&self.temperature) {
            return Err(SettingsError::TemperatureOutOfRange(self.temperature));
        }

        if self.log_retention_days == 0 {
            return Err(SettingsError::RetentionTooShort);
        }

        if !self.model_allow_list.is_empty() && !self.model_allow_list.contains(&self.model) {
            return Err(SettingsError::ModelNotAllowed {
                model: self.model.clone(),
                allowed: self.model_allow_list.join(", "),
            });
        }

        Ok(())
    }

    /// Write the settings to `path` as JSON, renaming any existing file to a
    /// `.bak` sibling first.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        if path.exists() {
            let mut backup = path.as_os_str().to_owned();
            backup.push(".bak");
            fs::rename(path, &backup)
                .with_context(|| format!("Failed to back up existing config: {}", path.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Write a default-valued config file only if none exists at `path`.
    pub fn create_default(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            return Ok(());
        }
        Settings::default().save(path)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
