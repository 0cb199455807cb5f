use anyhow::{anyhow, Context, Result};
use ethers::abi::{Abi, Token};
use ethers::contract::ContractFactory;
use ethers::providers::Middleware;
use ethers::types::{Address, Bytes};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};

/// One contract creation declared by a deployment module.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCreation {
    pub contract: &'static str,
    pub constructor_args: Vec<Token>,
}

/// A named deployment module: an ordered list of contract creations.
#[derive(Debug, Clone)]
pub struct DeployModule {
    pub name: &'static str,
    pub creations: Vec<ContractCreation>,
}

/// The UserAccount module: a single UserAccountManager wired to the entry
/// point on construction.
pub fn user_account_module(entry_point: Address) -> DeployModule {
    let user_account_manager = ContractCreation {
        contract: "UserAccountManager",
        constructor_args: vec![Token::Address(entry_point)],
    };

    // OwnerAccountPaymaster is declared but not deployed yet. When it is
    // enabled it takes the entry point and the deployed manager address:
    //
    // let owner_account_paymaster = ContractCreation {
    //     contract: "OwnerAccountPaymaster",
    //     constructor_args: vec![
    //         Token::Address(entry_point),
    //         Token::Address(user_account_manager_address),
    //     ],
    // };

    DeployModule {
        name: "UserAccountModule",
        creations: vec![user_account_manager],
    }
}

/// Compiled contract artifact: the subset of the build output we need to
/// construct a `ContractFactory`. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    #[serde(default)]
    pub contract_name: Option<String>,
    pub abi: Abi,
    pub bytecode: String,
}

impl ContractArtifact {
    pub fn load(artifacts_dir: &Path, contract: &str) -> Result<Self> {
        let path = artifacts_dir.join(format!("{contract}.json"));
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read contract artifact {}", path.display()))?;
        let art: ContractArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse contract artifact {}", path.display()))?;
        if art.bytecode.trim_start_matches("0x").is_empty() {
            return Err(anyhow!(
                "artifact {} has empty bytecode (interface or abstract contract?)",
                path.display()
            ));
        }
        Ok(art)
    }

    pub fn bytecode_bytes(&self) -> Result<Bytes> {
        let hex_str = self.bytecode.trim_start_matches("0x");
        let bytes = hex::decode(hex_str)
            .with_context(|| format!("invalid hex bytecode in artifact for {:?}", self.contract_name))?;
        Ok(Bytes::from(bytes))
    }
}

/// Executes a deployment module: one contract-creation transaction per
/// declared creation, awaited in order. Returns (contract, address) pairs.
pub async fn execute<M: Middleware + 'static>(
    module: &DeployModule,
    artifacts_dir: &Path,
    client: Arc<M>,
) -> Result<Vec<(&'static str, Address)>> {
    let mut deployed = Vec::with_capacity(module.creations.len());

    for creation in &module.creations {
        let art = ContractArtifact::load(artifacts_dir, creation.contract)?;
        let factory = ContractFactory::new(art.abi.clone(), art.bytecode_bytes()?, client.clone());

        let deployer = factory
            .deploy_tokens(creation.constructor_args.clone())
            .map_err(|e| {
                anyhow!(
                    "failed to encode constructor args for {}: {e}",
                    creation.contract
                )
            })?;

        tracing::info!(contract = creation.contract, "sending creation transaction");
        let contract = deployer
            .send()
            .await
            .map_err(|e| anyhow!("deployment of {} failed: {e}", creation.contract))?;

        deployed.push((creation.contract, contract.address()));
    }

    Ok(deployed)
}

#[cfg(test)]
mod tests {
    use super::{user_account_module, ContractArtifact};
    use ethers::abi::Token;
    use ethers::types::Address;
    use std::str::FromStr;

    const ENTRY_POINT: &str = "0x2aC9FFE590d7030417b3eaf3Cd0573B2d77A3cad";

    #[test]
    fn module_declares_single_manager_creation() {
        let ep = Address::from_str(ENTRY_POINT).unwrap();
        let module = user_account_module(ep);

        assert_eq!(module.name, "UserAccountModule");
        assert_eq!(module.creations.len(), 1);

        let creation = &module.creations[0];
        assert_eq!(creation.contract, "UserAccountManager");
        assert_eq!(creation.constructor_args, vec![Token::Address(ep)]);
    }

    #[test]
    fn module_does_not_declare_the_paymaster() {
        let ep = Address::from_str(ENTRY_POINT).unwrap();
        let module = user_account_module(ep);
        assert!(module
            .creations
            .iter()
            .all(|c| c.contract != "OwnerAccountPaymaster"));
    }

    #[test]
    fn artifact_parses_and_decodes_bytecode() {
        let raw = serde_json::json!({
            "contractName": "UserAccountManager",
            "abi": [],
            "bytecode": "0x6080604052",
            "deployedBytecode": "0x00"
        });
        let art: ContractArtifact = serde_json::from_value(raw).unwrap();
        assert_eq!(art.contract_name.as_deref(), Some("UserAccountManager"));
        assert_eq!(
            art.bytecode_bytes().unwrap().to_vec(),
            vec![0x60, 0x80, 0x60, 0x40, 0x52]
        );
    }

    #[test]
    fn artifact_rejects_bad_hex() {
        let raw = serde_json::json!({
            "abi": [],
            "bytecode": "0xzz"
        });
        let art: ContractArtifact = serde_json::from_value(raw).unwrap();
        assert!(art.bytecode_bytes().is_err());
    }
}
