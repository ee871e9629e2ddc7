//! Ledger Gateway - Esplora-style block explorer API
//!
//! The wallet's only view of the chain. Everything it returns is remote,
//! unauthenticated and eventually consistent.
//!
//! | Endpoint | Method | Used for |
//! |----------|--------|----------|
//! | `/address/{addr}/utxo` | GET | balance refresh, send snapshot |
//! | `/address/{addr}/txs` | GET | history |
//! | `/tx/{txid}` | GET | lookup (404 → none) |
//! | `/tx/{txid}/hex` | GET | previous transaction for inputs |
//! | `/tx` | POST | broadcast raw hex |
//! | `/fee-estimates` | GET | default fee rate (6-block target) |

mod esplora;
mod types;

pub use esplora::{explorer_base, EsploraClient};
pub use types::{FeeEstimates, TransactionRecord, TxInputRecord, TxOutputRecord, TxStatus, Utxo};

use async_trait::async_trait;
use tracing::warn;

use crate::core::paths::DEFAULT_CONFIRMATION_TARGET;
use crate::error::WalletResult;
use crate::keys::Network;

/// sat/vB used when the gateway has no usable 6-block estimate.
pub const FALLBACK_FEE_RATE: u64 = 2;

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    fn network(&self) -> Network;

    /// Switch the base URL to `network`'s endpoint.
    fn set_network(&self, network: Network);

    async fn utxos(&self, address: &str) -> WalletResult<Vec<Utxo>>;

    async fn transactions(&self, address: &str) -> WalletResult<Vec<TransactionRecord>>;

    async fn transaction(&self, txid: &str) -> WalletResult<Option<TransactionRecord>>;

    async fn transaction_hex(&self, txid: &str) -> WalletResult<String>;

    /// Returns the txid. Non-success responses surface as `BroadcastRejected`
    /// carrying the gateway's text.
    async fn broadcast(&self, raw_hex: &str) -> WalletResult<String>;

    async fn fee_estimates(&self) -> WalletResult<FeeEstimates>;

    fn explorer_tx_url(&self, txid: &str) -> String;

    fn explorer_address_url(&self, address: &str) -> String;

    /// 6-block estimate, or `FALLBACK_FEE_RATE` when unavailable or malformed.
    async fn fee_rate(&self) -> u64 {
        match self.fee_estimates().await {
            Ok(est) => est.rate_for(DEFAULT_CONFIRMATION_TARGET).unwrap_or(FALLBACK_FEE_RATE),
            Err(e) => {
                warn!(error = %e, "fee estimate unavailable, using fallback");
                FALLBACK_FEE_RATE
            }
        }
    }
}
