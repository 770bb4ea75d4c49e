use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::contract::descriptor::default_contract_address;
use crate::contract::ContractDescriptor;
use crate::model::Address;

const CONFIG_DIR_NAME: &str = ".taskchain";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub contract_address: String,
    pub block_time_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "devnet".to_string(),
            chain_id: 31337,
            contract_address: default_contract_address().to_string(),
            block_time_ms: 800,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    pub accounts: usize,
    /// `false` runs as if no wallet extension were installed.
    pub installed: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            accounts: 3,
            installed: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
}

impl AppConfig {
    /// An explicit path must exist. Without one, `~/.taskchain/config.json`
    /// is used when present and the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.contract_address()?;
        if self.wallet.accounts == 0 {
            return Err(anyhow!("wallet.accounts must be at least 1"));
        }
        Ok(())
    }

    pub fn contract_address(&self) -> Result<Address> {
        Address::parse(&self.network.contract_address)
            .map_err(|e| anyhow!("network.contract_address: {}", e))
    }

    pub fn descriptor(&self) -> Result<ContractDescriptor> {
        Ok(ContractDescriptor::task_manager(self.contract_address()?))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.network.chain_id, 31337);
        assert!(config.wallet.installed);
        assert!(config.descriptor().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "network": {{ "block_time_ms": 5 }}, "wallet": {{ "installed": false }} }}"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.network.block_time_ms, 5);
        assert_eq!(config.network.name, "devnet");
        assert!(!config.wallet.installed);
        assert_eq!(config.wallet.accounts, 3);
    }

    #[test]
    fn test_load_rejects_bad_address() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "network": {{ "contract_address": "0x12" }} }}"#).unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.json"))).is_err());
    }
}
