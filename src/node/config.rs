//! Node Configuration - passed from the application shell

use std::path::PathBuf;
use std::time::Duration;

use crate::keys::Network;

/// Node configuration. The app shell constructs this.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub app: String,
    pub data_dir: Option<PathBuf>,
    pub wallet: WalletConfig,
    pub price: PriceConfig,
}

impl NodeConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self { self.data_dir = Some(path.into()); self }
    pub fn with_wallet(mut self, c: WalletConfig) -> Self { self.wallet = c; self }
    pub fn with_price(mut self, c: PriceConfig) -> Self { self.price = c; self }

    /// Explicit dir, else `$BEEWALLET_ROOT/<app>`, else the platform data dir.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            let root = std::env::var("BEEWALLET_ROOT").map(PathBuf::from)
                .unwrap_or_else(|_| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")));
            root.join(&self.app)
        })
    }
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Used until the persisted "is testnet" flag says otherwise.
    pub network: Network,
    pub esplora: EsploraConfig,
    /// Delay between a successful broadcast and the balance refresh.
    pub refresh_delay: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self { network: Network::default(), esplora: EsploraConfig::default(), refresh_delay: Duration::from_secs(5) }
    }
}

impl WalletConfig {
    pub fn mainnet() -> Self { Self { network: Network::Mainnet, ..Default::default() } }
    pub fn testnet() -> Self { Self { network: Network::Testnet, ..Default::default() } }
    pub fn with_esplora(mut self, c: EsploraConfig) -> Self { self.esplora = c; self }
    pub fn with_refresh_delay(mut self, d: Duration) -> Self { self.refresh_delay = d; self }
}

#[derive(Debug, Clone)]
pub struct EsploraConfig {
    pub mainnet_url: String,
    pub testnet_url: String,
    pub timeout: Duration,
}

impl Default for EsploraConfig {
    fn default() -> Self {
        Self {
            mainnet_url: "https://blockstream.info/api".into(),
            testnet_url: "https://blockstream.info/testnet/api".into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl EsploraConfig {
    pub fn with_urls(mainnet: impl Into<String>, testnet: impl Into<String>) -> Self {
        Self { mainnet_url: mainnet.into(), testnet_url: testnet.into(), ..Default::default() }
    }
    pub fn with_timeout(mut self, t: Duration) -> Self { self.timeout = t; self }
}

#[derive(Debug, Clone)]
pub struct PriceConfig {
    /// CoinGecko-compatible `simple/price` endpoint.
    pub url: String,
    pub currency: String,
    pub ttl: Duration,
    pub timeout: Duration,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            url: "https://api.coingecko.com/api/v3/simple/price".into(),
            currency: "eur".into(),
            ttl: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PriceConfig {
    pub fn with_currency(mut self, c: impl Into<String>) -> Self { self.currency = c.into().to_lowercase(); self }
    pub fn with_ttl(mut self, ttl: Duration) -> Self { self.ttl = ttl; self }
}
