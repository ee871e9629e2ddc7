//! Shared test harness: in-memory ledger gateway and funding helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use beewallet::error::{WalletError, WalletResult};
use beewallet::gateway::{FeeEstimates, LedgerGateway, TransactionRecord, TxStatus, Utxo};
use beewallet::keys::{parse_address, Network};
use beewallet::node::WalletConfig;
use beewallet::store::{MemoryFlagStore, MemorySecretStore};
use beewallet::wallet::WalletService;
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::{deserialize_hex, serialize_hex};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

// Well-known test vector, never use with real funds
pub const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const MAINNET_ADDR: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
pub const TESTNET_ADDR: &str = "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl";

// BIP84 vector: account 0, receive index 1
pub const MAINNET_RECIPIENT: &str = "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g";

/// Blocks the next `utxos` call until released.
struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[derive(Default)]
pub struct MockGateway {
    network: RwLock<Network>,
    utxos: Mutex<HashMap<String, Vec<Utxo>>>,
    tx_hex: Mutex<HashMap<String, String>>,
    records: Mutex<HashMap<String, Vec<TransactionRecord>>>,
    broken_hex: Mutex<HashSet<String>>,
    fail_utxos: Mutex<bool>,
    reject: Mutex<Option<String>>,
    fee_estimates: Mutex<Option<FeeEstimates>>,
    gate: Mutex<Option<Gate>>,
    pub broadcasts: Mutex<Vec<String>>,
    pub utxo_calls: AtomicUsize,
    nonce: AtomicU32,
}

impl MockGateway {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Create a confirmed funding transaction paying `value` to `address`
    /// and register it as a UTXO. Returns its txid.
    pub fn fund(&self, address: &str, network: Network, value: u64) -> String {
        let spk = parse_address(address, network).expect("own address").script_pubkey();
        let tx = funding_tx(spk, value, self.nonce.fetch_add(1, Ordering::SeqCst));
        let txid = tx.compute_txid().to_string();
        self.tx_hex.lock().unwrap().insert(txid.clone(), serialize_hex(&tx));
        self.utxos.lock().unwrap().entry(address.to_string()).or_default().push(Utxo {
            txid: txid.clone(),
            vout: 0,
            value,
            status: TxStatus { confirmed: true, block_height: Some(800_000), ..Default::default() },
        });
        txid
    }

    pub fn set_utxos(&self, address: &str, utxos: Vec<Utxo>) {
        self.utxos.lock().unwrap().insert(address.to_string(), utxos);
    }

    pub fn break_hex(&self, txid: &str) {
        self.broken_hex.lock().unwrap().insert(txid.to_string());
    }

    pub fn fail_utxos(&self, fail: bool) {
        *self.fail_utxos.lock().unwrap() = fail;
    }

    pub fn reject_broadcast(&self, reason: &str) {
        *self.reject.lock().unwrap() = Some(reason.to_string());
    }

    pub fn set_fee_estimates(&self, estimates: FeeEstimates) {
        *self.fee_estimates.lock().unwrap() = Some(estimates);
    }

    pub fn add_record(&self, address: &str, record: TransactionRecord) {
        self.records.lock().unwrap().entry(address.to_string()).or_default().push(record);
    }

    /// Hold the next `utxos` call. Await the returned `entered` notify to
    /// know it is suspended; notify `release` to let it finish.
    pub fn hold_next_utxos(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Gate { entered: entered.clone(), release: release.clone() });
        (entered, release)
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    fn network(&self) -> Network { *self.network.read().unwrap() }

    fn set_network(&self, network: Network) { *self.network.write().unwrap() = network; }

    async fn utxos(&self, address: &str) -> WalletResult<Vec<Utxo>> {
        self.utxo_calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.utxos.lock().unwrap().get(address).cloned().unwrap_or_default();
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if *self.fail_utxos.lock().unwrap() {
            return Err(WalletError::Network("connection refused".into()));
        }
        Ok(snapshot)
    }

    async fn transactions(&self, address: &str) -> WalletResult<Vec<TransactionRecord>> {
        Ok(self.records.lock().unwrap().get(address).cloned().unwrap_or_default())
    }

    async fn transaction(&self, txid: &str) -> WalletResult<Option<TransactionRecord>> {
        Ok(self.records.lock().unwrap().values().flatten().find(|r| r.txid == txid).cloned())
    }

    async fn transaction_hex(&self, txid: &str) -> WalletResult<String> {
        if self.broken_hex.lock().unwrap().contains(txid) {
            return Err(WalletError::Network("HTTP 502 Bad Gateway".into()));
        }
        self.tx_hex
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .ok_or_else(|| WalletError::Network(format!("HTTP 404: {}", txid)))
    }

    async fn broadcast(&self, raw_hex: &str) -> WalletResult<String> {
        if let Some(reason) = self.reject.lock().unwrap().clone() {
            return Err(WalletError::BroadcastRejected(reason));
        }
        let tx: Transaction = deserialize_hex(raw_hex)
            .map_err(|e| WalletError::BroadcastRejected(format!("TX decode failed: {}", e)))?;
        self.broadcasts.lock().unwrap().push(raw_hex.to_string());
        Ok(tx.compute_txid().to_string())
    }

    async fn fee_estimates(&self) -> WalletResult<FeeEstimates> {
        self.fee_estimates
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WalletError::Network("fee estimates unavailable".into()))
    }

    fn explorer_tx_url(&self, txid: &str) -> String {
        format!("https://explorer.test/{}/tx/{}", self.network(), txid)
    }

    fn explorer_address_url(&self, address: &str) -> String {
        format!("https://explorer.test/{}/address/{}", self.network(), address)
    }
}

fn funding_tx(script_pubkey: ScriptBuf, value: u64, nonce: u32) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::from_bytes(nonce.to_le_bytes().to_vec()),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: Amount::from_sat(value), script_pubkey }],
    }
}

pub struct Harness {
    pub wallet: WalletService,
    pub gateway: Arc<MockGateway>,
    pub secrets: Arc<MemorySecretStore>,
    pub flags: Arc<MemoryFlagStore>,
}

pub fn harness() -> Harness {
    harness_with(WalletConfig::mainnet().with_refresh_delay(Duration::from_millis(20)))
}

pub fn harness_with(config: WalletConfig) -> Harness {
    let gateway = MockGateway::new();
    let secrets = Arc::new(MemorySecretStore::new());
    let flags = Arc::new(MemoryFlagStore::new());
    let wallet = WalletService::new(config, gateway.clone(), secrets.clone(), flags.clone());
    Harness { wallet, gateway, secrets, flags }
}

/// Wait for any scheduled refresh to finish.
pub async fn settle(wallet: &WalletService) {
    for _ in 0..100 {
        if !wallet.refresh_pending() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("scheduled refresh did not finish");
}
