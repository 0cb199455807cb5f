mod config;
mod deploy;
mod encoding;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{load_deployment, sender_private_key, Deployment};
use ethers::prelude::*;
use ethers::providers::Middleware;
use ethers::types::TransactionRequest;
use ethers::utils::parse_ether;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default funding amount, in ether units.
const FUND_AMOUNT_ETH: &str = "50";

#[derive(Parser, Debug)]
#[command(
    name = "useraccount-ops",
    version,
    about = "Deploy, inspect, and fund the UserAccount contracts on a dev chain"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy the UserAccount module (UserAccountManager wired to the entry point).
    Deploy(DeployArgs),

    /// Check the native balance of an address (the paymaster by default).
    Balance(BalanceArgs),

    /// Fund an address with native currency from the dev account.
    Fund(FundArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Deployment artifact (chain id, RPC, contract addresses).
    #[arg(long, default_value = "deployments/dev.json")]
    deployment: PathBuf,

    /// Override the chain RPC URL (otherwise uses deployment JSON).
    #[arg(long, env = "UA_OPS_RPC_URL")]
    rpc: Option<String>,
}

#[derive(Args, Debug)]
struct DeployArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Override the entry point address from the deployment JSON.
    #[arg(long)]
    entrypoint: Option<String>,

    /// Directory containing compiled contract artifacts (abi + bytecode JSON).
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Environment variable holding the deployer's private key.
    #[arg(long, default_value = "ACCOUNT0_PRIVATE_KEY")]
    private_key_env: String,
}

#[derive(Args, Debug)]
struct BalanceArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Address to query (defaults to ownerAccountPaymaster from the deployment JSON).
    #[arg(long)]
    address: Option<String>,
}

#[derive(Args, Debug)]
struct FundArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Recipient (defaults to ownerAccountPaymaster from the deployment JSON).
    #[arg(long)]
    to: Option<String>,

    /// Amount to send, in ether units.
    #[arg(long, default_value = FUND_AMOUNT_ETH)]
    amount_eth: String,

    /// Environment variable holding the sender's private key.
    #[arg(long, default_value = "ACCOUNT0_PRIVATE_KEY")]
    private_key_env: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        // Always write logs to stderr so stdout can be used for script-friendly outputs.
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Deploy(args) => cmd_deploy(args).await,
        Command::Balance(args) => cmd_balance(args).await,
        Command::Fund(args) => cmd_fund(args).await,
    }
}

/// Opens the provider and verifies the RPC actually serves the configured
/// chain. Refuses to proceed on a mismatch.
async fn connect(dep: &Deployment) -> Result<Provider<Http>> {
    let provider = Provider::<Http>::try_from(dep.rpc_url.as_str())
        .with_context(|| format!("invalid RPC URL {}", dep.rpc_url))?
        .interval(Duration::from_millis(350));

    let chain_id = provider
        .get_chainid()
        .await
        .with_context(|| format!("failed to connect to {}", dep.rpc_url))?
        .as_u64();
    if chain_id != dep.chain_id {
        bail!(
            "chainId mismatch: deployment has {}, RPC returned {}",
            dep.chain_id,
            chain_id
        );
    }

    Ok(provider)
}

fn sender_wallet(key_env: &str, chain_id: u64) -> Result<LocalWallet> {
    let key = sender_private_key(key_env);
    let wallet = key
        .trim()
        .trim_start_matches("0x")
        .parse::<LocalWallet>()
        .map_err(|e| anyhow!("invalid private key in {key_env}: {e}"))?;
    Ok(wallet.with_chain_id(chain_id))
}

async fn cmd_deploy(args: DeployArgs) -> Result<()> {
    let dep = load_deployment(&args.common.deployment, args.common.rpc.clone())?;

    let entry_point = match &args.entrypoint {
        Some(s) => encoding::parse_checksummed(s).context("invalid --entrypoint address")?,
        None => dep.entry_point,
    };
    let module = deploy::user_account_module(entry_point);

    let wallet = sender_wallet(&args.private_key_env, dep.chain_id)?;
    let provider = connect(&dep).await?;
    let client = Arc::new(SignerMiddleware::new(provider, wallet));

    println!(
        "Deploying module {} (entryPoint: {})",
        module.name,
        encoding::fmt_address(entry_point)
    );

    let deployed = deploy::execute(&module, &args.artifacts, client).await?;
    for (contract, address) in deployed {
        println!("{contract}: {}", encoding::fmt_address(address));
    }

    Ok(())
}

async fn cmd_balance(args: BalanceArgs) -> Result<()> {
    let dep = load_deployment(&args.common.deployment, args.common.rpc.clone())?;

    // Validate the target before anything touches the network.
    let address = match &args.address {
        Some(s) => encoding::parse_checksummed(s).context("invalid --address")?,
        None => dep.owner_account_paymaster,
    };

    let provider = connect(&dep).await?;
    let balance = provider
        .get_balance(address, None)
        .await
        .context("failed to fetch balance")?;

    println!("Balance of {}:", encoding::fmt_address(address));
    println!("{} ETH", encoding::fmt_eth(balance));
    println!("{} Wei", balance);

    Ok(())
}

async fn cmd_fund(args: FundArgs) -> Result<()> {
    let dep = load_deployment(&args.common.deployment, args.common.rpc.clone())?;

    let to = match &args.to {
        Some(s) => encoding::parse_checksummed(s).context("invalid --to address")?,
        None => dep.owner_account_paymaster,
    };
    let value = parse_ether(args.amount_eth.as_str())
        .map_err(|e| anyhow!("invalid --amount-eth value '{}': {e}", args.amount_eth))?;

    let wallet = sender_wallet(&args.private_key_env, dep.chain_id)?;
    let sender = wallet.address();
    let provider = connect(&dep).await?;
    let client = SignerMiddleware::new(provider, wallet);

    println!(
        "Funding {} ETH from sender: {} to: {}",
        args.amount_eth,
        encoding::fmt_address(sender),
        encoding::fmt_address(to)
    );

    let tx = TransactionRequest::new().to(to).value(value);
    println!("Sending transaction");
    let pending = client
        .send_transaction(tx, None)
        .await
        .context("failed to submit funding transaction")?;

    println!(
        "Transaction hash: {} Waiting for confirmation...",
        encoding::fmt_h256(pending.tx_hash())
    );

    let receipt = pending
        .await
        .context("error while waiting for confirmation")?
        .ok_or_else(|| anyhow!("transaction dropped from the mempool"))?;
    if receipt.status != Some(1.into()) {
        bail!(
            "funding transaction reverted in block {:?}",
            receipt.block_number
        );
    }

    println!("Transaction sent successfully");
    Ok(())
}
