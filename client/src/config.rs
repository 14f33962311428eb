//! Client configuration loaded from environment variables, plus the
//! per-network contract deployments file.
//!
//! The deployments file replaces the per-contract artifact `networks` maps
//! the platform publishes at deploy time: a JSON object keyed by network id,
//! each entry naming the addresses of the deployed contracts on that
//! network. A network with no entry (or an entry missing a contract) still
//! produces a working gateway; calls against the missing contract fail at
//! call time.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{ClientError, Result};
use crate::models::Address;

/// Local development endpoint used when no wallet endpoint is configured.
pub const FALLBACK_RPC_URL: &str = "http://127.0.0.1:8545";

/// Default IPFS HTTP API endpoint.
pub const DEFAULT_IPFS_API_URL: &str = "http://127.0.0.1:5001";

#[derive(Debug, Clone)]
pub struct Config {
    /// Wallet / provider JSON-RPC endpoint.
    pub wallet_rpc_url: String,
    /// IPFS HTTP API endpoint for profile and metadata documents.
    pub ipfs_api_url: String,
    /// Path to the JSON deployments file.
    pub deployments_path: PathBuf,
    /// Path of the single persistent session slot.
    pub session_path: PathBuf,
    /// Addresses granted administrative access.
    pub admins: Vec<Address>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let admins = match std::env::var("CFD_ADMIN_ADDRESSES") {
            Ok(raw) => parse_admin_list(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Config {
            wallet_rpc_url: env_or("CFD_WALLET_RPC", FALLBACK_RPC_URL),
            ipfs_api_url: env_or("CFD_IPFS_API", DEFAULT_IPFS_API_URL),
            deployments_path: env_or("CFD_DEPLOYMENTS", "./deployments.json").into(),
            session_path: env_or("CFD_SESSION_FILE", "./.crowdfund/session").into(),
            admins,
        })
    }

    pub fn is_admin(&self, address: &Address) -> bool {
        self.admins.contains(address)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_admin_list(raw: &str) -> Result<Vec<Address>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Address::parse(s)
                .map_err(|_| ClientError::Config(format!("invalid admin address: {s}")))
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// Deployments
// ─────────────────────────────────────────────────────────

/// Deployed contract addresses for one network.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkContracts {
    pub hash_storage: Option<Address>,
    pub project_ledger: Option<Address>,
    pub crowdsale: Option<Address>,
}

/// Deployed addresses keyed by network id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Deployments(HashMap<String, NetworkContracts>);

impl Deployments {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read deployments file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ClientError::Config(format!("malformed deployments file {}: {e}", path.display()))
        })
    }

    /// Build a one-network table directly; used by tests and embedded setups.
    pub fn single(network_id: u64, contracts: NetworkContracts) -> Self {
        let mut map = HashMap::new();
        map.insert(network_id.to_string(), contracts);
        Deployments(map)
    }

    /// Addresses for `network_id`; an unknown network yields an empty entry
    /// so every contract lookup on it fails at call time.
    pub fn network(&self, network_id: u64) -> NetworkContracts {
        self.0
            .get(&network_id.to_string())
            .cloned()
            .unwrap_or_default()
    }
}
