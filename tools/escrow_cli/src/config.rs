//! CLI configuration
//!
//! Settings come from an optional TOML file and are overridden by command
//! line flags. The file is located via `--config`, then
//! `ESCROW_CLI_CONFIG_PATH`; without either, built-in defaults apply.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::{collections::HashMap, path::Path};

use crate::parse_pubkey;

pub const CONFIG_PATH_ENV: &str = "ESCROW_CLI_CONFIG_PATH";
pub const DEFAULT_RPC_URL: &str = "http://localhost:8899";
pub const DEFAULT_COMMITMENT: &str = "confirmed";

// ============================================================================
// CONFIGURATION FILE
// ============================================================================

/// Contents of the TOML configuration file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// RPC endpoint of the cluster
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Deployed escrow program (base58)
    #[serde(default)]
    pub program_id: Option<String>,
    /// Path to the default fee payer keypair
    #[serde(default)]
    pub payer: Option<String>,
    /// One of `processed`, `confirmed`, `finalized`
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_commitment() -> String {
    DEFAULT_COMMITMENT.to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            program_id: None,
            payer: None,
            commitment: default_commitment(),
        }
    }
}

impl CliConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse CLI configuration")
    }

    /// Load the configuration file.
    ///
    /// An explicit path (from `--config`) takes precedence over the
    /// environment variable. A path that was asked for but does not exist is
    /// an error; no path at all yields the defaults.
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let path = match explicit_path {
            Some(path) => Some(path.to_string()),
            None => std::env::var(CONFIG_PATH_ENV).ok(),
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !Path::new(&path).exists() {
            bail!("Configuration file '{path}' not found");
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration file '{path}'"))?;
        Self::from_toml(&content).with_context(|| format!("In configuration file '{path}'"))
    }
}

// ============================================================================
// RESOLVED SETTINGS
// ============================================================================

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub program_id: Option<Pubkey>,
    pub payer: Option<String>,
    pub commitment: CommitmentConfig,
}

impl Settings {
    /// Merge the file configuration with `--rpc`, `--program-id`, `--payer`
    /// and `--commitment` flags.
    pub fn resolve(config: CliConfig, options: &HashMap<String, String>) -> Result<Self> {
        let rpc_url = options.get("rpc").cloned().unwrap_or(config.rpc_url);
        let program_id = options
            .get("program-id")
            .or(config.program_id.as_ref())
            .map(|value| parse_pubkey(value))
            .transpose()?;
        let payer = options.get("payer").cloned().or(config.payer);
        let commitment = options
            .get("commitment")
            .map(String::as_str)
            .unwrap_or(config.commitment.as_str());

        Ok(Self {
            rpc_url,
            program_id,
            payer,
            commitment: parse_commitment(commitment)?,
        })
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        self.program_id
            .ok_or_else(|| anyhow!("Missing program id: pass --program-id or set program_id in the config"))
    }
}

pub fn parse_commitment(value: &str) -> Result<CommitmentConfig> {
    match value {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => bail!("Unknown commitment '{other}'"),
    }
}
