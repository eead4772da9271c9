use crate::utils::error::Result;
use async_trait::async_trait;

/// Decides whether a request takes a route's failure branch.
pub trait FailureSource: Send + Sync {
    fn should_fail(&self, rate: f64) -> bool;
}

/// Where the contract suite sends its requests.
pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn probability_trials(&self) -> usize;
    fn timeout_seconds(&self) -> u64;
}

#[async_trait]
pub trait ContractCase<C: Sync>: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, client: &C) -> Result<String>;
}
