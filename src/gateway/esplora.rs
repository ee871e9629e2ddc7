//! Esplora HTTP client (reqwest). One client, base URL chosen by network.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use super::{FeeEstimates, LedgerGateway, TransactionRecord, Utxo};
use crate::core::paths::esplora as paths;
use crate::error::{WalletError, WalletResult};
use crate::keys::Network;
use crate::node::EsploraConfig;

pub struct EsploraClient {
    http: Client,
    config: EsploraConfig,
    network: RwLock<Network>,
}

impl EsploraClient {
    pub fn new(config: EsploraConfig, network: Network) -> WalletResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WalletError::Network(format!("http client: {}", e)))?;
        Ok(Self { http, config, network: RwLock::new(network) })
    }

    /// API base URL of the active network, without trailing slash.
    pub fn base_url(&self) -> String {
        let url = match self.network() {
            Network::Mainnet => &self.config.mainnet_url,
            Network::Testnet => &self.config.testnet_url,
        };
        url.trim_end_matches('/').to_string()
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url(), path) }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> WalletResult<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(http_error(status, resp.text().await.unwrap_or_default()));
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl LedgerGateway for EsploraClient {
    fn network(&self) -> Network {
        *self.network.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_network(&self, network: Network) {
        *self.network.write().unwrap_or_else(|p| p.into_inner()) = network;
        info!(%network, base_url = %self.base_url(), "gateway network switched");
    }

    async fn utxos(&self, address: &str) -> WalletResult<Vec<Utxo>> {
        self.get_json(&paths::address_utxos(address)).await
    }

    async fn transactions(&self, address: &str) -> WalletResult<Vec<TransactionRecord>> {
        self.get_json(&paths::address_txs(address)).await
    }

    async fn transaction(&self, txid: &str) -> WalletResult<Option<TransactionRecord>> {
        let url = self.url(&paths::tx(txid));
        let resp = self.http.get(&url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.json().await?)),
            s => Err(http_error(s, resp.text().await.unwrap_or_default())),
        }
    }

    async fn transaction_hex(&self, txid: &str) -> WalletResult<String> {
        let url = self.url(&paths::tx_hex(txid));
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(http_error(status, body));
        }
        Ok(body.trim().to_string())
    }

    async fn broadcast(&self, raw_hex: &str) -> WalletResult<String> {
        let resp = self
            .http
            .post(self.url(paths::TX))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(raw_hex.to_string())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(%status, reason = %body.trim(), "broadcast rejected");
            return Err(WalletError::BroadcastRejected(body.trim().to_string()));
        }
        let txid = body.trim().to_string();
        info!(%txid, "broadcast accepted");
        Ok(txid)
    }

    async fn fee_estimates(&self) -> WalletResult<FeeEstimates> {
        self.get_json(paths::FEE_ESTIMATES).await
    }

    fn explorer_tx_url(&self, txid: &str) -> String {
        format!("{}/tx/{}", explorer_base(&self.base_url()), txid)
    }

    fn explorer_address_url(&self, address: &str) -> String {
        format!("{}/address/{}", explorer_base(&self.base_url()), address)
    }
}

fn http_error(status: StatusCode, body: String) -> WalletError {
    WalletError::Network(format!("HTTP {}: {}", status, body.trim()))
}

/// Human browsing root for an API base: `https://host/testnet/api` → `https://host/testnet`.
pub fn explorer_base(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed).to_string()
}
