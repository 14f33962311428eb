//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("{contract} has no deployed address on network {network}")]
    NotDeployed {
        contract: &'static str,
        network: String,
    },

    #[error("wallet returned no accounts")]
    NoAccounts,

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("content decode error: {0}")]
    ContentDecode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("amount out of range: {0}")]
    AmountRange(String),
}

impl ClientError {
    /// True when the failure means the chain environment itself is unusable
    /// (no provider, no accounts, contract not deployed on this network).
    /// Page controllers map these onto their terminal not-connected state.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ClientError::Http(_)
                | ClientError::Rpc { .. }
                | ClientError::NotDeployed { .. }
                | ClientError::NoAccounts
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
