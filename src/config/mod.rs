#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::contract::DEFAULT_TRIALS;
use crate::core::ConfigProvider;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Contract suite settings for library callers that do not go through clap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub base_url: String,
    pub trials: usize,
    pub timeout_seconds: u64,
}

impl SuiteConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            trials: DEFAULT_TRIALS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ConfigProvider for SuiteConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn probability_trials(&self) -> usize {
        self.trials
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}
