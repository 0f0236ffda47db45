//! Error types for the bridge

use thiserror::Error;

/// Main error type for a bridge operation
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Chain {chain_id} not found")]
    ChainNotFound { chain_id: u64 },

    #[error("Chain connection error for chain {chain_id}: {message}")]
    ChainConnection { chain_id: u64, message: String },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Bad request to XY Finance API. Response status: {status}, body: {body}")]
    Api { status: u16, body: String },

    #[error("No route found for {src_chain_id} -> {dst_chain_id}")]
    NoRoute { src_chain_id: u64, dst_chain_id: u64 },

    #[error("Aggregator response is missing field `{0}`")]
    MissingField(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Check if the whole operation may be retried by the caller
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::ChainConnection { .. } => true,
            BridgeError::Http(e) => e.is_timeout() || e.is_connect(),
            BridgeError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
