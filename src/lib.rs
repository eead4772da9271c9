pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::{toml_config::MockConfig, SuiteConfig};
pub use core::{
    contract::{ContractSuite, SuiteReport},
    server::{MockServer, ServerHandle},
};
pub use utils::error::{MockError, Result};
