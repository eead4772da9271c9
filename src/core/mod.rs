pub mod contract;
pub mod failure;
pub mod routes;
pub mod server;
pub mod template;

pub use crate::domain::model::{Reply, RequestSnapshot, RouteDefinition};
pub use crate::domain::ports::{ConfigProvider, ContractCase, FailureSource};
pub use crate::utils::error::Result;
