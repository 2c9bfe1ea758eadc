pub mod accounts;
pub mod chain;
pub mod config;
pub mod deploy;
pub mod error;
pub mod ordering;
pub mod predictor;

pub use chain::{Chain, RpcChain};
pub use error::{DeployError, Result};
