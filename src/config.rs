use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256, address, utils::parse_ether};

use crate::error::{DeployError, Result};
use crate::ordering::SortPosition;

/// first account of anvil and hardhat dev nodes, only used on local networks
pub const DEV_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const WETH_ARBITRUM: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");
pub const POSITION_MANAGER_ARBITRUM: Address = address!("C36442b4a4522E871399CD717aBDD847Ab11FE88");
pub const UNISWAP_FACTORY_ARBITRUM: Address = address!("1F98431c8aD98523631AE4a59f267346ea31F984");
pub const VAULT_ARBITRUM: Address = address!("70358e35957f16b818588a3CFA57cc73d7D126c3");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub rpc_url: String,
    pub is_local: bool,
}

impl Network {
    fn resolve(name: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let alchemy = |host: &str| -> Result<String> {
            let key = lookup("ALCHEMY_API_KEY").ok_or_else(|| {
                DeployError::Config(format!("ALCHEMY_API_KEY is required for network {name}"))
            })?;
            Ok(format!("https://{host}/v2/{key}"))
        };

        let (default_url, is_local) = match name {
            "localhost" | "hardhat" => (None, true),
            "mainnet" => (Some("eth-mainnet.alchemyapi.io"), false),
            "arbitrum" => (Some("arb-mainnet.g.alchemy.com"), false),
            "arbitrumGoerli" => (Some("arb-goerli.g.alchemy.com"), false),
            "arbitrumSepolia" => (Some("arb-sepolia.g.alchemy.com"), false),
            other => return Err(DeployError::Config(format!("unknown network `{other}`"))),
        };

        let rpc_url = match (lookup("RPC_URL"), default_url) {
            (Some(url), _) => url,
            (None, Some(host)) => alchemy(host)?,
            (None, None) => "http://127.0.0.1:8545".to_string(),
        };

        Ok(Self {
            name: name.to_string(),
            rpc_url,
            is_local,
        })
    }

    /// name of the `wallets/<name>.json` file holding supplemental keys.
    /// the in-process hardhat network forks arbitrum and shares its accounts.
    pub fn wallet_name(&self) -> &str {
        match self.name.as_str() {
            "hardhat" => "arbitrum",
            name => name,
        }
    }
}

/// addresses of the contracts the vault integrates with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalContracts {
    pub wrapped_native: Address,
    pub position_manager: Address,
    pub factory: Address,
}

impl Default for ExternalContracts {
    fn default() -> Self {
        Self {
            wrapped_native: WETH_ARBITRUM,
            position_manager: POSITION_MANAGER_ARBITRUM,
            factory: UNISWAP_FACTORY_ARBITRUM,
        }
    }
}

/// steps of the deploy routine that cost gas or change state, all off by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub deploy: bool,
    pub add_funds: bool,
    pub create_pool: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderingSettings {
    pub position: SortPosition,
    pub max_iterations: Option<u64>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub network: Network,
    pub deployer_key: String,
    pub contracts: ExternalContracts,
    pub flags: FeatureFlags,
    pub ordering: OrderingSettings,
    /// vault used by the funding and pool steps when nothing is deployed
    pub vault_address: Address,
    /// wei sent to the vault by the funding step
    pub vault_funding: U256,
    pub token_artifact: PathBuf,
    pub vault_artifact: PathBuf,
    pub wallets_dir: PathBuf,
}

impl Settings {
    pub fn from_env(network: &str) -> Result<Self> {
        Self::from_lookup(network, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(network: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let network = Network::resolve(network, &lookup)?;

        let deployer_key = match lookup("DEPLOYER_PRIVATE_KEY") {
            Some(key) => key,
            None if network.is_local => DEV_PRIVATE_KEY.to_string(),
            None => {
                return Err(DeployError::Config(format!(
                    "DEPLOYER_PRIVATE_KEY is required for network {}",
                    network.name
                )));
            }
        };

        let defaults = ExternalContracts::default();
        let contracts = ExternalContracts {
            wrapped_native: parse_or(&lookup, "WRAPPED_NATIVE_TOKEN", defaults.wrapped_native)?,
            position_manager: parse_or(&lookup, "POSITION_MANAGER", defaults.position_manager)?,
            factory: parse_or(&lookup, "UNISWAP_FACTORY", defaults.factory)?,
        };

        let flags = FeatureFlags {
            deploy: flag(&lookup, "CAN_DEPLOY")?,
            add_funds: flag(&lookup, "CAN_ADD_FUNDS")?,
            create_pool: flag(&lookup, "CAN_CREATE_POOL")?,
        };

        let ordering = OrderingSettings {
            position: parse_or(&lookup, "TOKEN_SORT_POSITION", SortPosition::Before)?,
            max_iterations: parse_opt(&lookup, "ORDERING_MAX_ITERATIONS")?,
            timeout: parse_opt::<u64>(&lookup, "ORDERING_TIMEOUT_SECS")?
                .map(Duration::from_secs),
        };

        Ok(Self {
            network,
            deployer_key,
            contracts,
            flags,
            ordering,
            vault_address: parse_or(&lookup, "VAULT_ADDRESS", VAULT_ARBITRUM)?,
            vault_funding: ether(&lookup, "VAULT_FUNDING", "0.0045")?,
            token_artifact: lookup("TOKEN_ARTIFACT")
                .unwrap_or_else(|| "artifacts/contracts/InuX.sol/InuX.json".to_string())
                .into(),
            vault_artifact: lookup("VAULT_ARTIFACT")
                .unwrap_or_else(|| "artifacts/contracts/InuXVault.sol/InuXVault.json".to_string())
                .into(),
            wallets_dir: lookup("WALLETS_DIR")
                .unwrap_or_else(|| "wallets".to_string())
                .into(),
        })
    }
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| DeployError::Config(format!("invalid {key} `{raw}`: {e}")))
        })
        .transpose()
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

fn ether(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<U256> {
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    parse_ether(raw.trim()).map_err(|e| DeployError::Config(format!("invalid {key} `{raw}`: {e}")))
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(DeployError::Config(format!("invalid {key} `{other}`"))),
    }
}
