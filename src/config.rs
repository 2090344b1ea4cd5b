use crate::error::{Result, TranslateError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Runtime settings for a [`Translator`](crate::Translator).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// How many times a busy or locked statement is retried.
    pub busy_retries: u32,
    /// Linear backoff step between busy retries.
    pub busy_backoff_ms: u64,
    pub register_builtin_functions: bool,
    /// Reject invalid calendar dates instead of storing the zero date.
    pub strict_dates: bool,
    /// Run the deferred VACUUM requested by OPTIMIZE/REPAIR/ANALYZE on close.
    pub vacuum_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            busy_retries: 100,
            busy_backoff_ms: 5,
            register_builtin_functions: true,
            strict_dates: false,
            vacuum_on_close: true,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TranslateError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.busy_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}
