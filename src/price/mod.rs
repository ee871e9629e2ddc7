//! Price - BTC/fiat quote with a TTL cache.
//!
//! Owned by the composition root; there is no process-wide price global.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{WalletError, WalletResult};
use crate::node::PriceConfig;

const SATS_PER_BTC: f64 = 100_000_000.0;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fiat price of one BTC.
    async fn btc_price(&self, currency: &str) -> WalletResult<f64>;
}

/// CoinGecko `simple/price?ids=bitcoin&vs_currencies=<cur>`.
pub struct CoinGeckoPriceSource {
    http: reqwest::Client,
    url: String,
}

impl CoinGeckoPriceSource {
    pub fn new(config: &PriceConfig) -> WalletResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WalletError::Network(format!("http client: {}", e)))?;
        Ok(Self { http, url: config.url.clone() })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoPriceSource {
    async fn btc_price(&self, currency: &str) -> WalletResult<f64> {
        let resp = self
            .http
            .get(&self.url)
            .query(&[("ids", "bitcoin"), ("vs_currencies", currency)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(WalletError::Network(format!("HTTP {}", resp.status())));
        }
        let body: HashMap<String, HashMap<String, f64>> = resp.json().await?;
        body.get("bitcoin")
            .and_then(|m| m.get(currency))
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| WalletError::InvalidResponse(format!("no bitcoin/{} quote", currency)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub price: f64,
    pub fetched_at: DateTime<Utc>,
    /// True when served from an expired cache entry after a failed fetch.
    pub stale: bool,
}

struct CachedPrice {
    price: f64,
    fetched_at: DateTime<Utc>,
    fetched: Instant,
}

pub struct PriceService {
    source: Arc<dyn PriceSource>,
    currency: String,
    ttl: Duration,
    cache: Mutex<Option<CachedPrice>>,
}

impl PriceService {
    pub fn new(source: Arc<dyn PriceSource>, config: &PriceConfig) -> Self {
        Self { source, currency: config.currency.clone(), ttl: config.ttl, cache: Mutex::new(None) }
    }

    pub fn currency(&self) -> &str { &self.currency }

    /// Cached quote while fresh; otherwise fetch. A failed fetch falls back
    /// to the last known quote, marked stale.
    pub async fn price(&self) -> WalletResult<PriceQuote> {
        let mut cache = self.cache.lock().await;
        if let Some(c) = cache.as_ref() {
            if c.fetched.elapsed() < self.ttl {
                return Ok(PriceQuote { price: c.price, fetched_at: c.fetched_at, stale: false });
            }
        }
        match self.source.btc_price(&self.currency).await {
            Ok(price) => {
                debug!(price, currency = %self.currency, "price refreshed");
                let fetched_at = Utc::now();
                *cache = Some(CachedPrice { price, fetched_at, fetched: Instant::now() });
                Ok(PriceQuote { price, fetched_at, stale: false })
            }
            Err(e) => match cache.as_ref() {
                Some(c) => {
                    warn!(error = %e, "price fetch failed, serving stale quote");
                    Ok(PriceQuote { price: c.price, fetched_at: c.fetched_at, stale: true })
                }
                None => Err(e),
            },
        }
    }

    pub async fn fiat_value(&self, sats: u64) -> WalletResult<f64> {
        Ok(sats_to_fiat(sats, self.price().await?.price))
    }

    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

pub fn sats_to_fiat(sats: u64, btc_price: f64) -> f64 {
    sats as f64 / SATS_PER_BTC * btc_price
}
