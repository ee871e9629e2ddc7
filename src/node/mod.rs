//! Node - Composition root for the wallet core
//!
//! Assembles stores, gateway, wallet and price services once at startup and
//! hands out shared references. Nothing here is global.

mod config;

pub use config::{EsploraConfig, NodeConfig, PriceConfig, WalletConfig};

use std::sync::Arc;
use tracing::info;

use crate::error::{WalletError, WalletResult};
use crate::gateway::{EsploraClient, LedgerGateway};
use crate::price::{CoinGeckoPriceSource, PriceService, PriceSource};
use crate::store::{FileFlagStore, FlagStore, ObfuscatedFileSecretStore, SecretStore};
use crate::wallet::{WalletService, WalletStatus};

const SECRETS_FILE: &str = "secrets.json";
const FLAGS_FILE: &str = "flags.json";

/// Pluggable collaborators. `Node::from_config` fills these with the
/// default file stores and HTTP clients.
pub struct NodeComponents {
    pub gateway: Arc<dyn LedgerGateway>,
    pub secrets: Arc<dyn SecretStore>,
    pub flags: Arc<dyn FlagStore>,
    pub price_source: Arc<dyn PriceSource>,
}

#[derive(Clone)]
pub struct Node {
    config: Arc<NodeConfig>,
    wallet: WalletService,
    price: Arc<PriceService>,
}

impl Node {
    /// Default wiring: file-backed stores under the data dir, Esplora and
    /// CoinGecko over HTTPS.
    pub fn from_config(config: NodeConfig) -> WalletResult<Self> {
        let data_dir = config.resolved_data_dir();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| WalletError::Storage(format!("data dir {}: {}", data_dir.display(), e)))?;

        let gateway = EsploraClient::new(config.wallet.esplora.clone(), config.wallet.network)?;
        let components = NodeComponents {
            gateway: Arc::new(gateway),
            secrets: Arc::new(ObfuscatedFileSecretStore::new(data_dir.join(SECRETS_FILE))),
            flags: Arc::new(FileFlagStore::new(data_dir.join(FLAGS_FILE))),
            price_source: Arc::new(CoinGeckoPriceSource::new(&config.price)?),
        };
        info!(app = %config.app, data_dir = %data_dir.display(), "node configured");
        Ok(Self::with_components(config, components))
    }

    pub fn with_components(config: NodeConfig, components: NodeComponents) -> Self {
        let wallet = WalletService::new(
            config.wallet.clone(),
            components.gateway,
            components.secrets,
            components.flags,
        );
        let price = Arc::new(PriceService::new(components.price_source, &config.price));
        Self { config: Arc::new(config), wallet, price }
    }

    /// Load the persisted wallet. Returns once the state is known; the first
    /// balance refresh runs in the background.
    pub async fn start(&self) -> WalletResult<WalletStatus> {
        self.wallet.load_wallet().await
    }

    pub fn wallet(&self) -> &WalletService { &self.wallet }

    pub fn price(&self) -> &PriceService { &self.price }

    pub fn config(&self) -> &NodeConfig { &self.config }
}
