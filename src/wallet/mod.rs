//! Wallet module - single-address P2WPKH wallet over an Esplora gateway
//!
//! # Architecture
//!
//! ```text
//! WalletService (state machine, one per app)
//!     │
//!     ├── load / create / restore / delete / switch_network
//!     │       └── SecretStore (mnemonic) + FlagStore (has_wallet, is_testnet)
//!     │
//!     ├── refresh_balance → LedgerGateway::utxos (epoch-tagged, stale results dropped)
//!     │
//!     └── send → TransactionBuilder → LedgerGateway::broadcast
//!                                          │
//!                                          ▼
//!                               RefreshScheduler (delayed refresh)
//! ```

mod builder;
mod history;
mod receive;
mod service;

pub use builder::{
    estimate_fee, SignedTransaction, SkippedInput, SpendPlan, TransactionBuilder, DUST_RESERVE,
    DUST_THRESHOLD, FALLBACK_FEE,
};
pub use history::TransactionDetails;
pub use receive::{format_btc, ReceiveRequest};
pub use service::{RefreshOutcome, SendReceipt, WalletService, WalletSnapshot, WalletStatus};
