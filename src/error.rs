use std::time::Duration;

use alloy::primitives::{Address, TxHash};

/// error type returned by every fallible operation of the deployer.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("config error: {0}")]
    Config(String),
    #[error("rpc error: {0}")]
    Transport(#[from] alloy::transports::TransportError),
    #[error("pending transaction error: {0}")]
    PendingTransaction(#[from] alloy::providers::PendingTransactionError),
    #[error("signer error: {0}")]
    Signer(#[from] alloy::signers::local::LocalSignerError),
    #[error("units error: {0}")]
    Units(#[from] alloy::primitives::utils::UnitsError),
    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("deployment transaction {0} has no contract address")]
    MissingContractAddress(TxHash),
    #[error("nonce overflow: {nonce} + {offset}")]
    NonceOverflow { nonce: u64, offset: u64 },
    #[error("no ordered address after {attempts} self-transfers, last candidate {last}")]
    IterationLimit { attempts: u64, last: Address },
    #[error("ordering loop timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, DeployError>;
