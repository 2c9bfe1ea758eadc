use std::fs;
use std::path::Path;

use alloy::{
    primitives::{Address, Bytes, TxHash, U256, utils::format_ether},
    sol_types::{SolCall, SolValue},
};
use log::{info, warn};
use serde::Deserialize;

use crate::chain::Chain;
use crate::config::Settings;
use crate::error::Result;
use crate::ordering::{OrderedAddress, OrderingLoop, SortCondition};
use crate::predictor::predict_address;

alloy::sol!(
    interface IInuXVault {
        function createPoolAndAddLiquidity() external;
    }
);

#[derive(Deserialize)]
struct Artifact {
    bytecode: String,
}

/// reads creation code from a hardhat artifact (`.json` with a `bytecode`
/// field) or from a plain hex file.
pub fn load_creation_code(path: &Path) -> Result<Bytes> {
    let contents = fs::read_to_string(path)?;
    let hex_code = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str::<Artifact>(&contents)?.bytecode
    } else {
        contents
    };
    let hex_code = hex_code.trim();
    let code = hex::decode(hex_code.strip_prefix("0x").unwrap_or(hex_code))?;
    Ok(code.into())
}

#[derive(Debug, Clone)]
pub struct CreationCode {
    pub token: Bytes,
    pub vault: Bytes,
}

impl CreationCode {
    pub fn load(settings: &Settings) -> Result<Self> {
        Ok(Self {
            token: load_creation_code(&settings.token_artifact)?,
            vault: load_creation_code(&settings.vault_artifact)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContracts {
    pub ordering: OrderedAddress,
    pub token: Address,
    pub vault: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub deployed: Option<DeployedContracts>,
    pub vault: Address,
    pub funding_tx: Option<TxHash>,
    pub pool_tx: Option<TxHash>,
}

/// deploys the token at an address ordered against the wrapped native token,
/// then the vault. the token's constructor takes the vault address, which is
/// predicted one nonce ahead.
pub async fn deploy_contracts<C: Chain + ?Sized>(
    chain: &C,
    settings: &Settings,
    code: &CreationCode,
) -> Result<DeployedContracts> {
    let contracts = &settings.contracts;

    let mut ordering = OrderingLoop::new(SortCondition::new(
        contracts.wrapped_native,
        settings.ordering.position,
    ));
    if let Some(max) = settings.ordering.max_iterations {
        ordering = ordering.with_max_iterations(max);
    }
    if let Some(timeout) = settings.ordering.timeout {
        ordering = ordering.with_timeout(timeout);
    }
    let ordered = ordering.run(chain).await?;

    let vault_prediction = predict_address(chain, chain.signer_address(), 1).await?;
    info!(
        "token {} vault {}",
        ordered.address.to_checksum(None),
        vault_prediction.address.to_checksum(None)
    );

    let token_code = [
        code.token.as_ref(),
        (vault_prediction.address,).abi_encode_params().as_slice(),
    ]
    .concat();
    let token = chain.deploy(token_code.into()).await?;
    if token != ordered.address {
        warn!("token deployed at {token}, expected {}", ordered.address);
    }

    let vault_args = (
        contracts.position_manager,
        contracts.factory,
        contracts.wrapped_native,
        token,
    )
        .abi_encode_params();
    let vault_code = [code.vault.as_ref(), vault_args.as_slice()].concat();
    let vault = chain.deploy(vault_code.into()).await?;
    if vault != vault_prediction.address {
        warn!(
            "vault deployed at {vault}, token was built for {}",
            vault_prediction.address
        );
    }

    info!("deployed token {token} and vault {vault}");
    Ok(DeployedContracts {
        ordering: ordered,
        token,
        vault,
    })
}

pub async fn fund_vault<C: Chain + ?Sized>(chain: &C, vault: Address, value: U256) -> Result<TxHash> {
    info!(
        "sending {} ether to {vault} from {}",
        format_ether(value),
        chain.signer_address()
    );
    chain.transfer(vault, value).await
}

pub async fn create_pool<C: Chain + ?Sized>(chain: &C, vault: Address) -> Result<TxHash> {
    info!("calling createPoolAndAddLiquidity on {vault}");
    let input = IInuXVault::createPoolAndAddLiquidityCall {}.abi_encode();
    chain.call(vault, input.into()).await
}

/// runs the enabled steps of the deploy routine in order.
pub async fn run<C: Chain + ?Sized>(chain: &C, settings: &Settings) -> Result<DeployReport> {
    info!(
        "deploying on {} from {}",
        settings.network.name,
        chain.signer_address()
    );

    let deployed = if settings.flags.deploy {
        let code = CreationCode::load(settings)?;
        Some(deploy_contracts(chain, settings, &code).await?)
    } else {
        None
    };
    let vault = deployed.map_or(settings.vault_address, |d| d.vault);

    let funding_tx = if settings.flags.add_funds {
        Some(fund_vault(chain, vault, settings.vault_funding).await?)
    } else {
        None
    };

    let pool_tx = match (settings.flags.create_pool, settings.network.is_local) {
        (true, true) => Some(create_pool(chain, vault).await?),
        (true, false) => {
            warn!("pool creation is only enabled on local networks, skipping");
            None
        }
        (false, _) => None,
    };

    Ok(DeployReport {
        deployed,
        vault,
        funding_tx,
        pool_tx,
    })
}
