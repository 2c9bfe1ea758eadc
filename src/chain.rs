use alloy::{
    network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use log::debug;

use crate::error::{DeployError, Result};

/// the slice of an EVM client the deployer needs.
///
/// every submitting method waits for the transaction receipt before it
/// returns, so at most one transaction from the signer is in flight.
#[async_trait]
pub trait Chain: Send + Sync {
    /// account that signs and pays for every submitted transaction
    fn signer_address(&self) -> Address;

    /// current transaction count (nonce) of `account`
    async fn transaction_count(&self, account: Address) -> Result<u64>;

    async fn transfer(&self, to: Address, value: U256) -> Result<TxHash>;

    /// deploys `code` (creation code with encoded constructor args appended)
    async fn deploy(&self, code: Bytes) -> Result<Address>;

    async fn call(&self, to: Address, input: Bytes) -> Result<TxHash>;

    /// zero-value transfer from the signer to itself, used to advance its nonce
    async fn self_transfer(&self) -> Result<TxHash> {
        self.transfer(self.signer_address(), U256::ZERO).await
    }
}

/// [`Chain`] backed by an alloy http provider.
pub struct RpcChain {
    provider: DynProvider,
    signer: Address,
}

impl RpcChain {
    /// connects to `rpc_url`. the first signer is the default sender; the
    /// rest are registered in the wallet as additional accounts.
    pub async fn connect(rpc_url: &str, signers: Vec<PrivateKeySigner>) -> Result<Self> {
        let mut signers = signers.into_iter();
        let deployer = signers
            .next()
            .ok_or_else(|| DeployError::Config("at least one signer is required".to_string()))?;
        let signer = deployer.address();

        let mut wallet = EthereumWallet::from(deployer);
        for extra in signers {
            wallet.register_signer(extra);
        }

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(rpc_url)
            .await?
            .erased();

        Ok(Self { provider, signer })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt> {
        let receipt = self
            .provider
            .send_transaction(tx.with_from(self.signer))
            .await?
            .get_receipt()
            .await?;

        if !ReceiptResponse::status(&receipt) {
            return Err(DeployError::Reverted(receipt.transaction_hash));
        }
        debug!(
            "transaction {} included in block {:?}",
            receipt.transaction_hash, receipt.block_number
        );

        Ok(receipt)
    }
}

#[async_trait]
impl Chain for RpcChain {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn transaction_count(&self, account: Address) -> Result<u64> {
        let count = self.provider.get_transaction_count(account).await?;
        Ok(count)
    }

    async fn transfer(&self, to: Address, value: U256) -> Result<TxHash> {
        let tx = TransactionRequest::default().with_to(to).with_value(value);
        let receipt = self.submit(tx).await?;
        Ok(receipt.transaction_hash)
    }

    async fn deploy(&self, code: Bytes) -> Result<Address> {
        let tx = TransactionRequest::default().with_deploy_code(code);
        let receipt = self.submit(tx).await?;
        receipt
            .contract_address
            .ok_or(DeployError::MissingContractAddress(receipt.transaction_hash))
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<TxHash> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        let receipt = self.submit(tx).await?;
        Ok(receipt.transaction_hash)
    }
}
