use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use alloy::signers::local::PrivateKeySigner;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_ACCOUNT_COUNT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAccount {
    pub private_key: String,
    pub address: String,
}

impl From<&PrivateKeySigner> for GeneratedAccount {
    fn from(signer: &PrivateKeySigner) -> Self {
        Self {
            private_key: format!("0x{}", hex::encode(signer.to_bytes())),
            address: signer.address().to_checksum(None),
        }
    }
}

/// `count` fresh random key pairs
pub fn generate_accounts(count: usize) -> Vec<GeneratedAccount> {
    (0..count)
        .into_par_iter()
        .map(|_| GeneratedAccount::from(&PrivateKeySigner::random()))
        .collect()
}

/// writes `accounts` as a pretty printed json list, replacing `path`.
pub fn write_accounts(path: &Path, accounts: &[GeneratedAccount]) -> Result<()> {
    let json = serde_json::to_string_pretty(accounts)?;
    fs::write(path, json)?;
    info!("saved {} accounts to {}", accounts.len(), path.display());
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletEntry {
    private_key: String,
}

pub fn wallet_file(dir: &Path, network: &str) -> PathBuf {
    dir.join(format!("{network}.json"))
}

/// private keys listed in `<dir>/<network>.json`. a missing file means no
/// supplemental accounts.
pub fn load_wallet_keys(dir: &Path, network: &str) -> Result<Vec<String>> {
    let path = wallet_file(dir, network);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no wallet file at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let entries: Vec<WalletEntry> = serde_json::from_str(&contents)?;
    info!("loaded {} wallet keys from {}", entries.len(), path.display());

    Ok(entries.into_iter().map(|e| e.private_key).collect())
}

/// deployer signer followed by the supplemental accounts of `network`.
pub fn signing_accounts(
    deployer_key: &str,
    dir: &Path,
    network: &str,
) -> Result<Vec<PrivateKeySigner>> {
    let mut signers = vec![deployer_key.parse::<PrivateKeySigner>()?];
    for key in load_wallet_keys(dir, network)? {
        signers.push(key.parse()?);
    }
    Ok(signers)
}
