//! Beewallet: single-address Bitcoin wallet core for a mobile shell.
//!
//! # Architecture
//!
//! ```text
//! Node (composition root)
//!   │
//!   ├── WalletService (state machine)
//!   │     ├── keys      → BIP39 mnemonic, BIP84 P2WPKH derivation
//!   │     ├── store     → SecretStore (mnemonic), FlagStore (has_wallet, is_testnet)
//!   │     ├── gateway   → LedgerGateway (Esplora HTTP)
//!   │     └── builder   → select, sign, serialize
//!   │
//!   └── PriceService (BTC/fiat, TTL cache)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use beewallet::{Node, NodeConfig, WalletConfig};
//!
//! let node = Node::from_config(NodeConfig::new("myapp").with_wallet(WalletConfig::testnet()))?;
//! node.start().await?;
//!
//! let mnemonic = node.wallet().create_wallet().await?;
//! node.wallet().refresh_balance().await?;
//! let receipt = node.wallet().send("tb1q...", 10_000, Some(2)).await?;
//! ```

// =============================================================================
// Modules
// =============================================================================
pub mod core;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod logging;
pub mod node;
pub mod price;
pub mod runtime;
pub mod store;
pub mod wallet;

// =============================================================================
// Re-exports
// =============================================================================
pub use error::{WalletError, WalletResult};
pub use gateway::{EsploraClient, LedgerGateway};
pub use keys::{derive_address, validate_mnemonic, Mnemonic, Network};
pub use logging::init_logging;
pub use node::{EsploraConfig, Node, NodeComponents, NodeConfig, PriceConfig, WalletConfig};
pub use price::{PriceQuote, PriceService};
pub use runtime::RefreshScheduler;
pub use store::{FlagStore, SecretStore};
pub use wallet::{RefreshOutcome, SendReceipt, WalletService, WalletSnapshot, WalletStatus};
