//! Error taxonomy for the wallet core.
//!
//! Callers distinguish three families: fix your input, try again later, and
//! "this transaction cannot be sent as constructed".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Entropy source failed: {0}")]
    Entropy(String),

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Amount {amount} sat is below the dust threshold of {dust} sat")]
    AmountBelowDust { amount: u64, dust: u64 },

    #[error("No spendable outputs")]
    NoFunds,

    #[error("Insufficient funds: need {required} sat, have {available} sat")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("No wallet loaded")]
    NoWallet,
}

pub type WalletResult<T> = Result<T, WalletError>;

impl WalletError {
    /// Transient failures a caller may retry (pull-to-refresh).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Failures the user fixes by changing what they typed.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidMnemonic(_) | Self::InvalidAddress(_) | Self::AmountBelowDust { .. }
        )
    }

    /// The transaction cannot be sent as constructed.
    pub fn is_funds(&self) -> bool {
        matches!(
            self,
            Self::NoFunds | Self::InsufficientFunds { .. } | Self::BroadcastRejected(_)
        )
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WalletError::Timeout(e.to_string())
        } else if e.is_decode() {
            WalletError::InvalidResponse(e.to_string())
        } else {
            WalletError::Network(e.to_string())
        }
    }
}
