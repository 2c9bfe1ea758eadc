use alloy::primitives::Address;

use crate::chain::Chain;
use crate::error::{DeployError, Result};

/// contract address `account` produces when it deploys at `nonce`:
/// keccak256(rlp([account, nonce]))[12:]
pub fn contract_address(account: &Address, nonce: u64) -> Address {
    account.create(nonce)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub account: Address,
    pub nonce: u64,
    pub address: Address,
}

/// predicts the address of the contract `account` would create with its
/// transaction count advanced by `offset`.
pub async fn predict_address<C: Chain + ?Sized>(
    chain: &C,
    account: Address,
    offset: u64,
) -> Result<Prediction> {
    let count = chain.transaction_count(account).await?;
    let nonce = count
        .checked_add(offset)
        .ok_or(DeployError::NonceOverflow { nonce: count, offset })?;

    Ok(Prediction {
        account,
        nonce,
        address: contract_address(&account, nonce),
    })
}
