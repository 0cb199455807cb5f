use crate::encoding::parse_checksummed;
use anyhow::{Context, Result};
use ethers::types::Address;
use serde::Deserialize;
use std::{env, fs, path::Path};

/// Well-known dev-chain account #0 private key (hardhat/anvil default).
/// Public knowledge; only ever useful against a local development node.
pub const ACCOUNT0_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRaw {
    pub chain_id: u64,
    pub rpc: String,
    /// Optional name of an environment variable that contains the RPC URL.
    /// Useful to avoid committing provider API keys.
    #[serde(default)]
    pub rpc_env_var: Option<String>,
    pub entry_point: String,
    pub owner_account_paymaster: String,
}

#[derive(Debug, Clone)]
pub struct Deployment {
    pub chain_id: u64,
    pub rpc_url: String,
    pub entry_point: Address,
    pub owner_account_paymaster: Address,
}

pub fn load_deployment(path: &Path, rpc_override: Option<String>) -> Result<Deployment> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read deployment json at {}", path.display()))?;
    let raw: DeploymentRaw = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse deployment json at {}", path.display()))?;

    let rpc_url = if let Some(rpc) = rpc_override {
        rpc
    } else if let Some(env_var) = raw.rpc_env_var.clone() {
        env::var(&env_var).unwrap_or(raw.rpc.clone())
    } else {
        raw.rpc.clone()
    };

    let entry_point = parse_checksummed(&raw.entry_point).context("invalid entryPoint address")?;
    let owner_account_paymaster = parse_checksummed(&raw.owner_account_paymaster)
        .context("invalid ownerAccountPaymaster address")?;

    Ok(Deployment {
        chain_id: raw.chain_id,
        rpc_url,
        entry_point,
        owner_account_paymaster,
    })
}

/// Resolves the sender's private key: the configured env var if set, otherwise
/// the well-known dev account #0 key (with a warning).
pub fn sender_private_key(key_env: &str) -> String {
    match env::var(key_env) {
        Ok(k) => k,
        Err(_) => {
            tracing::warn!(
                env = key_env,
                "private key env var not set; falling back to the dev account #0 key"
            );
            ACCOUNT0_PRIVATE_KEY.to_string()
        }
    }
}
