//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default list filter and sort order
//! - Countdown tick cadence
//! - Reminder offsets and messages
//! - Input validation limits
//!
//! Configuration is stored at `~/.config/goaltick/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::countdown::Cadence;
use crate::error::{ConfigError, CoreError};
use crate::goal::ValidationLimits;
use crate::list::{FilterMode, SortKey};
use crate::notify::{ReminderOffset, ReminderPolicy};

/// List presentation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub default_sort: SortKey,
    #[serde(default)]
    pub default_filter: FilterMode,
}

/// Countdown tick cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_fast_tick_ms")]
    pub fast_tick_ms: u64,
    /// Switch to `fast_tick_ms` once this few seconds remain.
    #[serde(default = "default_fast_threshold_secs")]
    pub fast_threshold_secs: u64,
    #[serde(default = "default_true")]
    pub fast_path: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// When false the scheduler behaves as if permission was denied.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reminders")]
    pub reminders: Vec<ReminderOffset>,
    /// Sent once per goal after its deadline has passed.
    #[serde(default = "default_late_message")]
    pub late_message: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/goaltick/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub validation: ValidationLimits,
}

fn default_tick_ms() -> u64 {
    1_000
}
fn default_fast_tick_ms() -> u64 {
    100
}
fn default_fast_threshold_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_reminders() -> Vec<ReminderOffset> {
    vec![
        ReminderOffset {
            offset_minutes: -60,
            message: "One hour left for \"{title}\"".into(),
        },
        ReminderOffset {
            offset_minutes: 0,
            message: "Deadline reached for \"{title}\"".into(),
        },
    ]
}
fn default_late_message() -> String {
    "The deadline for \"{title}\" has passed".into()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_sort: SortKey::default(),
            default_filter: FilterMode::default(),
        }
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            fast_tick_ms: default_fast_tick_ms(),
            fast_threshold_secs: default_fast_threshold_secs(),
            fast_path: true,
        }
    }
}

impl CountdownConfig {
    pub fn cadence(&self) -> Cadence {
        Cadence {
            normal_ms: self.tick_ms.max(1),
            fast_ms: self.fast_tick_ms.max(1),
            fast_threshold_ms: self.fast_threshold_secs.saturating_mul(1_000),
            fast_path: self.fast_path,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reminders: default_reminders(),
            late_message: default_late_message(),
        }
    }
}

impl NotificationsConfig {
    pub fn policy(&self) -> ReminderPolicy {
        ReminderPolicy::new(self.reminders.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            countdown: CountdownConfig::default(),
            notifications: NotificationsConfig::default(),
            validation: ValidationLimits::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults out if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<Config>(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change a value in memory without touching disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.apply(key, value)?;
        self.save()?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.countdown.tick_ms, 1_000);
        assert_eq!(parsed.notifications.reminders.len(), 2);
        assert_eq!(parsed.validation, ValidationLimits::default());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.display.default_sort, SortKey::Deadline);
        assert_eq!(parsed.display.default_filter, FilterMode::All);
        assert!(parsed.countdown.fast_path);
        assert_eq!(parsed.validation.title_min, 3);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("countdown.tick_ms").as_deref(), Some("1000"));
        assert_eq!(cfg.get("display.default_sort").as_deref(), Some("deadline"));
        assert!(cfg.get("countdown.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("countdown.fast_path", "false").unwrap();
        cfg.apply("validation.title_max", "60").unwrap();
        cfg.apply("display.default_sort", "title").unwrap();
        assert!(!cfg.countdown.fast_path);
        assert_eq!(cfg.validation.title_max, 60);
        assert_eq!(cfg.display.default_sort, SortKey::Title);
    }

    #[test]
    fn apply_replaces_reminder_list_from_json() {
        let mut cfg = Config::default();
        cfg.apply(
            "notifications.reminders",
            r#"[{"offset_minutes": 15, "message": "Late: {title}"}]"#,
        )
        .unwrap();
        assert_eq!(cfg.notifications.reminders.len(), 1);
        assert_eq!(cfg.notifications.reminders[0].offset_minutes, 15);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("countdown.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_invalid_values() {
        let mut cfg = Config::default();
        assert!(cfg.apply("countdown.fast_path", "maybe").is_err());
        assert!(cfg.apply("countdown.tick_ms", "soon").is_err());
        assert!(cfg.apply("display.default_filter", "someday").is_err());
        assert_eq!(cfg.display.default_filter, FilterMode::All);
    }

    #[test]
    fn cadence_from_config() {
        let cadence = CountdownConfig::default().cadence();
        assert_eq!(cadence.normal_ms, 1_000);
        assert_eq!(cadence.fast_ms, 100);
        assert_eq!(cadence.fast_threshold_ms, 60_000);
    }

    #[test]
    fn huge_fast_threshold_saturates() {
        let mut cfg = Config::default();
        cfg.apply("countdown.fast_threshold_secs", "18446744073709551615")
            .unwrap();
        assert_eq!(cfg.countdown.cadence().fast_threshold_ms, u64::MAX);
    }
}
