use crate::config::toml_config::MockConfig;
use crate::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::core::contract::DEFAULT_TRIALS;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "mock-json-api")]
#[command(about = "A JSON mock server and the contract checks that go with it")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the route table until ctrl-c
    Serve(ServeArgs),
    /// Run the contract suite against a running server
    Check(CheckArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct ServeArgs {
    #[arg(long, help = "TOML route table; the built-in table is used when omitted")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Bind address, overrides server.bind")]
    pub bind: Option<String>,

    #[arg(long, help = "Seed for failure branches, overrides server.seed")]
    pub seed: Option<u64>,

    #[arg(long, help = "Log as JSON lines")]
    pub log_json: bool,
}

impl ServeArgs {
    /// 載入設定檔並套用命令列覆寫
    pub fn load_config(&self) -> Result<MockConfig> {
        let mut config = match &self.config {
            Some(path) => MockConfig::from_file(path)?,
            None => MockConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config = config.with_bind(bind);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct CheckArgs {
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value_t = DEFAULT_TRIALS, help = "Requests sent to /t/probability")]
    pub trials: usize,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    #[arg(long = "case", help = "Run only the named case (repeatable)")]
    pub cases: Vec<String>,
}

impl ConfigProvider for CheckArgs {
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

impl Validate for CheckArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_url("base_url", &self.base_url)?;
        validation::validate_positive_number("trials", self.trials, 1)?;
        validation::validate_positive_number("timeout_seconds", self.timeout_seconds as usize, 1)?;
        Ok(())
    }
}
