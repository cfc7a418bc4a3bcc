//! Environment variable parsing with error accumulation.
//!
//! The parser collects every problem it encounters so a misconfigured run
//! reports all missing/invalid variables in one pass instead of failing on
//! the first.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// A single problem with one environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// A required variable is absent or empty.
    #[error("required variable {var} is not set")]
    Missing { var: String },

    /// Value could not be parsed as a duration (humantime syntax, e.g. "30s").
    #[error("invalid duration for {var}: '{value}'")]
    InvalidDuration { var: String, value: String },

    /// Value could not be parsed as the expected type.
    #[error("invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },
}

/// Aggregate of all configuration problems found during startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ConfigErrors(pub Vec<EnvError>);

impl std::fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} configuration error(s):", self.0.len())?;
        for err in &self.0 {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

/// Type-safe parser for `PIPEVET_`-prefixed environment variables.
pub struct EnvParser {
    prefix: &'static str,
    errors: Vec<EnvError>,
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvParser {
    pub fn new() -> Self {
        Self {
            prefix: "PIPEVET_",
            errors: Vec::new(),
        }
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn raw(&self, name: &str) -> Option<String> {
        env::var(self.var_name(name))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Required string. Records [`EnvError::Missing`] when absent.
    pub fn require_string(&mut self, name: &str) -> Option<String> {
        match self.raw(name) {
            Some(value) => Some(value),
            None => {
                self.errors.push(EnvError::Missing {
                    var: self.var_name(name),
                });
                None
            }
        }
    }

    /// Optional string.
    pub fn get_string(&mut self, name: &str) -> Option<String> {
        self.raw(name)
    }

    /// String with a default.
    pub fn get_string_or(&mut self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_string())
    }

    /// Optional humantime duration ("30s", "5m", "1h").
    pub fn get_duration(&mut self, name: &str) -> Option<Duration> {
        let value = self.raw(name)?;
        match humantime::parse_duration(&value) {
            Ok(duration) => Some(duration),
            Err(_) => {
                self.errors.push(EnvError::InvalidDuration {
                    var: self.var_name(name),
                    value,
                });
                None
            }
        }
    }

    /// u32 with a default.
    pub fn get_u32_or(&mut self, name: &str, default: u32) -> u32 {
        match self.raw(name) {
            Some(value) => match value.parse::<u32>() {
                Ok(n) => n,
                Err(_) => {
                    self.errors.push(EnvError::InvalidValue {
                        var: self.var_name(name),
                        expected: "unsigned 32-bit integer".to_string(),
                        value,
                    });
                    default
                }
            },
            None => default,
        }
    }

    /// Semicolon-separated list (log filters contain commas, so `;` is the
    /// separator).
    pub fn get_string_list(&mut self, name: &str) -> Option<Vec<String>> {
        let value = self.raw(name)?;
        Some(
            value
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// Consume the parser; `Err` carries every accumulated problem.
    pub fn finish(self) -> Result<(), ConfigErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigErrors(self.errors))
        }
    }

    /// Whether any errors have been recorded so far.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
