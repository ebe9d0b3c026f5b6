//! Key/value settings snapshot consumed by the quota computation.
//!
//! Values are kept as strings, the way they arrive from a settings provider;
//! typed getters fall back to a default and log when a value is malformed.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, SchedulerError};

/// Snapshot of tunable settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    values: BTreeMap<String, String>,
}

impl DeviceSettings {
    /// Empty snapshot: every lookup yields its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set an integer value.
    pub fn set_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.set(key, value.to_string())
    }

    /// Remove a key so it falls back to its default.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Integer value for `key`, or `default` when missing or malformed.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, default, "malformed integer setting; using default");
                default
            }),
        }
    }

    /// Boolean value for `key`, or `default` when missing or malformed.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => default,
            Some(v) if v == "true" || v == "1" => true,
            Some(v) if v == "false" || v == "0" => false,
            Some(v) => {
                tracing::warn!(key, value = %v, default, "malformed boolean setting; using default");
                default
            }
        }
    }

    /// Number of keys present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// No keys present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a flat JSON object. Scalar values are kept; nested values are
    /// logged and skipped.
    ///
    /// # Errors
    /// [`SchedulerError::Config`] if the input is not a JSON object.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| SchedulerError::Config(format!("parse error: {e}")))?;
        let serde_json::Value::Object(map) = value else {
            return Err(SchedulerError::Config("settings must be a JSON object".into()));
        };
        let mut settings = Self::new();
        for (key, value) in map {
            match value {
                serde_json::Value::String(s) => {
                    settings.set(key, s);
                }
                serde_json::Value::Number(n) => {
                    settings.set(key, n.to_string());
                }
                serde_json::Value::Bool(b) => {
                    settings.set(key, b.to_string());
                }
                other => {
                    tracing::warn!(key, value = %other, "ignoring non-scalar setting");
                }
            }
        }
        Ok(settings)
    }

    /// Load `KEY=value` lines from a dotenv-style file.
    ///
    /// # Errors
    /// Fails if the file cannot be read or a line cannot be parsed.
    pub fn from_env_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let mut settings = Self::new();
        for item in iter {
            let (key, value) =
                item.with_context(|| format!("parsing settings file {}", path.display()))?;
            settings.set(key.to_ascii_lowercase(), value);
        }
        Ok(settings)
    }
}
