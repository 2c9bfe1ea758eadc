use std::path::PathBuf;
use std::time::Duration;

use alloy::{
    primitives::{Address, utils::format_ether},
    providers::Provider,
    signers::local::PrivateKeySigner,
};
use clap::{Parser, Subcommand};
use inux_deployer::{
    Chain, RpcChain,
    accounts::{self, DEFAULT_ACCOUNT_COUNT},
    config::Settings,
    deploy,
    ordering::{OrderingLoop, SortCondition, SortPosition, plan_offset},
    predictor::predict_address,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Network to run against (localhost, hardhat, mainnet, arbitrum, arbitrumGoerli, arbitrumSepolia)
    #[arg(short, long, env = "NETWORK", default_value = "localhost", global = true)]
    network: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict the address of the next contract an account deploys
    Predict {
        /// Account to predict for, defaults to the deployer
        #[arg(long)]
        account: Option<Address>,
        /// Nonces to skip past the current transaction count
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Send self-transfers until the deployer's next contract address sorts before or after a reference
    Order {
        /// Reference address, defaults to the wrapped native token
        #[arg(long)]
        reference: Option<Address>,
        /// Side of the reference the address has to sort on
        #[arg(long, value_enum)]
        position: Option<SortPosition>,
        #[arg(long)]
        max_iterations: Option<u64>,
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Only compute how many self-transfers are needed
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the enabled deployment steps (CAN_DEPLOY, CAN_ADD_FUNDS, CAN_CREATE_POOL)
    Deploy,
    /// Write fresh random accounts to a json file
    GenerateAccounts {
        #[arg(short, long, default_value_t = DEFAULT_ACCOUNT_COUNT)]
        count: usize,
        #[arg(short, long, default_value = "temp-accounts.json")]
        out: PathBuf,
    },
    /// List the signing accounts configured for the network
    Accounts,
}

const DRY_RUN_SEARCH_LIMIT: u64 = 1_000_000;

async fn connect(
    network: &str,
) -> Result<(Settings, Vec<PrivateKeySigner>, RpcChain), Box<dyn std::error::Error>> {
    let settings = Settings::from_env(network)?;
    let signers = accounts::signing_accounts(
        &settings.deployer_key,
        &settings.wallets_dir,
        settings.network.wallet_name(),
    )?;
    let chain = RpcChain::connect(&settings.network.rpc_url, signers.clone()).await?;
    Ok((settings, signers, chain))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::GenerateAccounts { count, out } => {
            accounts::write_accounts(&out, &accounts::generate_accounts(count))?;
            println!("generated {count} accounts, saved to {}", out.display());
        }
        Command::Predict { account, offset } => {
            let (_, _, chain) = connect(&args.network).await?;
            let account = account.unwrap_or(chain.signer_address());
            let prediction = predict_address(&chain, account, offset).await?;
            println!("account: {}", account.to_checksum(None));
            println!("nonce: {}", prediction.nonce);
            println!("predicted address: {}", prediction.address.to_checksum(None));
        }
        Command::Order {
            reference,
            position,
            max_iterations,
            timeout_secs,
            dry_run,
        } => {
            let (settings, _, chain) = connect(&args.network).await?;
            let condition = SortCondition::new(
                reference.unwrap_or(settings.contracts.wrapped_native),
                position.unwrap_or(settings.ordering.position),
            );

            if dry_run {
                let signer = chain.signer_address();
                let nonce = chain.transaction_count(signer).await?;
                let limit = max_iterations.unwrap_or(DRY_RUN_SEARCH_LIMIT);
                match plan_offset(&signer, nonce, &condition, limit) {
                    Some(offset) => println!(
                        "{offset} self-transfers needed, address {} at nonce {}",
                        signer.create(nonce + offset).to_checksum(None),
                        nonce + offset
                    ),
                    None => println!("no qualifying address within {limit} nonces"),
                }
                return Ok(());
            }

            let mut ordering = OrderingLoop::new(condition);
            if let Some(max) = max_iterations.or(settings.ordering.max_iterations) {
                ordering = ordering.with_max_iterations(max);
            }
            if let Some(timeout) = timeout_secs
                .map(Duration::from_secs)
                .or(settings.ordering.timeout)
            {
                ordering = ordering.with_timeout(timeout);
            }

            let ordered = ordering.run(&chain).await?;
            println!("address: {}", ordered.address.to_checksum(None));
            println!("nonce: {}", ordered.nonce);
            println!("self-transfers: {}", ordered.self_transfers);
        }
        Command::Deploy => {
            let (settings, _, chain) = connect(&args.network).await?;
            let report = deploy::run(&chain, &settings).await?;
            if let Some(deployed) = report.deployed {
                println!("token: {}", deployed.token.to_checksum(None));
                println!("vault: {}", deployed.vault.to_checksum(None));
            } else {
                println!("vault: {}", report.vault.to_checksum(None));
            }
            if let Some(tx) = report.funding_tx {
                println!("funding tx: {tx}");
            }
            if let Some(tx) = report.pool_tx {
                println!("pool tx: {tx}");
            }
        }
        Command::Accounts => {
            let (_, signers, chain) = connect(&args.network).await?;
            for signer in &signers {
                let address = signer.address();
                let balance = chain.provider().get_balance(address).await?;
                let nonce = chain.transaction_count(address).await?;
                println!(
                    "{} balance: {} nonce: {nonce}",
                    address.to_checksum(None),
                    format_ether(balance)
                );
            }
        }
    }

    Ok(())
}
