//! Wallet State Machine
//!
//! `Uninitialized → Loading → {NoWallet, Ready}`
//!
//! Mutating operations (create, restore, delete, switch network, send) are
//! serialized by an async mutex and persist before they publish the new
//! state. Refreshes are not serialized: each one records the epoch and the
//! address it was issued for, and its result is dropped if either changed
//! while the UTXO fetch was in flight.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::paths::{flags, secret};
use crate::error::{WalletError, WalletResult};
use crate::gateway::{LedgerGateway, Utxo};
use crate::keys::{derive_address, Mnemonic, Network};
use crate::node::WalletConfig;
use crate::runtime::RefreshScheduler;
use crate::store::{FlagStore, SecretStore};

use super::builder::{SkippedInput, TransactionBuilder, DUST_THRESHOLD};
use super::history::TransactionDetails;
use super::receive::ReceiveRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletStatus {
    Uninitialized,
    Loading,
    NoWallet,
    Ready,
}

/// Session state of a loaded wallet.
#[derive(Clone)]
struct ReadyWallet {
    mnemonic: Mnemonic,
    address: String,
    network: Network,
    utxos: Vec<Utxo>,
    balance: u64,
    refreshed_at: Option<DateTime<Utc>>,
}

impl ReadyWallet {
    fn new(mnemonic: Mnemonic, address: String, network: Network) -> Self {
        Self { mnemonic, address, network, utxos: Vec::new(), balance: 0, refreshed_at: None }
    }
}

enum WalletState {
    Uninitialized,
    Loading,
    NoWallet,
    Ready(ReadyWallet),
}

impl WalletState {
    fn status(&self) -> WalletStatus {
        match self {
            Self::Uninitialized => WalletStatus::Uninitialized,
            Self::Loading => WalletStatus::Loading,
            Self::NoWallet => WalletStatus::NoWallet,
            Self::Ready(_) => WalletStatus::Ready,
        }
    }

    fn ready(&self) -> WalletResult<&ReadyWallet> {
        match self {
            Self::Ready(w) => Ok(w),
            _ => Err(WalletError::NoWallet),
        }
    }
}

/// Read-only view of the wallet. Never carries the mnemonic.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSnapshot {
    pub status: WalletStatus,
    pub network: Network,
    pub address: Option<String>,
    pub balance: u64,
    pub utxos: Vec<Utxo>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { balance: u64, utxo_count: usize },
    /// The wallet changed (network switch, delete, restore) while the fetch
    /// was in flight; nothing was written.
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub txid: String,
    pub fee: u64,
    pub change: u64,
    pub skipped: Vec<SkippedInput>,
    pub explorer_url: String,
}

struct Inner {
    state: WalletState,
    network: Network,
    epoch: u64,
}

struct Shared {
    inner: RwLock<Inner>,
    ops: Mutex<()>,
    gateway: Arc<dyn LedgerGateway>,
    secrets: Arc<dyn SecretStore>,
    flags: Arc<dyn FlagStore>,
    scheduler: RefreshScheduler,
    config: WalletConfig,
}

#[derive(Clone)]
pub struct WalletService {
    shared: Arc<Shared>,
}

impl WalletService {
    pub fn new(
        config: WalletConfig,
        gateway: Arc<dyn LedgerGateway>,
        secrets: Arc<dyn SecretStore>,
        flags: Arc<dyn FlagStore>,
    ) -> Self {
        let network = config.network;
        gateway.set_network(network);
        Self {
            shared: Arc::new(Shared {
                inner: RwLock::new(Inner { state: WalletState::Uninitialized, network, epoch: 0 }),
                ops: Mutex::new(()),
                gateway,
                secrets,
                flags,
                scheduler: RefreshScheduler::new(),
                config,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.shared.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.shared.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Publish `state`, invalidating any refresh still in flight.
    fn publish(&self, state: WalletState) {
        let mut inner = self.write();
        inner.epoch += 1;
        inner.state = state;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn status(&self) -> WalletStatus { self.read().state.status() }

    pub fn network(&self) -> Network { self.read().network }

    pub fn address(&self) -> Option<String> {
        self.read().state.ready().ok().map(|w| w.address.clone())
    }

    pub fn balance(&self) -> u64 {
        self.read().state.ready().map(|w| w.balance).unwrap_or(0)
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        let inner = self.read();
        let ready = inner.state.ready().ok();
        WalletSnapshot {
            status: inner.state.status(),
            network: inner.network,
            address: ready.map(|w| w.address.clone()),
            balance: ready.map(|w| w.balance).unwrap_or(0),
            utxos: ready.map(|w| w.utxos.clone()).unwrap_or_default(),
            refreshed_at: ready.and_then(|w| w.refreshed_at),
        }
    }

    /// True while a scheduled refresh has not yet run.
    pub fn refresh_pending(&self) -> bool { self.shared.scheduler.is_pending() }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Startup. Reads the persisted flags and mnemonic; never waits on the
    /// network (the first refresh is scheduled, not awaited).
    pub async fn load_wallet(&self) -> WalletResult<WalletStatus> {
        let _ops = self.shared.ops.lock().await;
        self.publish(WalletState::Loading);

        let network = match self.shared.flags.get(flags::IS_TESTNET) {
            Ok(Some(testnet)) => Network::from_testnet_flag(testnet),
            Ok(None) => self.shared.config.network,
            Err(e) => {
                warn!(error = %e, "network flag unreadable, using configured network");
                self.shared.config.network
            }
        };
        self.shared.gateway.set_network(network);
        self.write().network = network;

        let has_wallet = match self.shared.flags.get_or(flags::HAS_WALLET, false) {
            Ok(v) => v,
            Err(e) => {
                self.publish(WalletState::NoWallet);
                return Err(e);
            }
        };
        if !has_wallet {
            self.publish(WalletState::NoWallet);
            info!(%network, "no wallet");
            return Ok(WalletStatus::NoWallet);
        }

        match self.read_stored_wallet(network).await {
            Some(wallet) => {
                info!(%network, address = %wallet.address, "wallet loaded");
                self.publish(WalletState::Ready(wallet));
                self.schedule_refresh(std::time::Duration::ZERO);
                Ok(WalletStatus::Ready)
            }
            None => {
                self.publish(WalletState::NoWallet);
                Ok(WalletStatus::NoWallet)
            }
        }
    }

    async fn read_stored_wallet(&self, network: Network) -> Option<ReadyWallet> {
        let phrase = match self.shared.secrets.get(secret::MNEMONIC).await {
            Ok(Some(phrase)) => phrase,
            Ok(None) => {
                warn!("wallet flag set but no stored mnemonic");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "stored mnemonic unreadable");
                return None;
            }
        };
        let mnemonic = match Mnemonic::parse(&phrase) {
            Ok(m) => m,
            Err(_) => {
                warn!("stored mnemonic is corrupted");
                return None;
            }
        };
        match derive_address(&mnemonic, network) {
            Ok(address) => Some(ReadyWallet::new(mnemonic, address, network)),
            Err(e) => {
                warn!(error = %e, "derivation failed for stored mnemonic");
                None
            }
        }
    }

    /// New wallet on the current network. The returned mnemonic is the only
    /// copy the caller gets; show it for backup.
    pub async fn create_wallet(&self) -> WalletResult<Mnemonic> {
        let _ops = self.shared.ops.lock().await;
        let mnemonic = Mnemonic::generate()?;
        let network = self.network();
        let address = derive_address(&mnemonic, network)?;

        self.persist_mnemonic(&mnemonic).await?;
        self.shared.scheduler.cancel();
        self.publish(WalletState::Ready(ReadyWallet::new(mnemonic.clone(), address.clone(), network)));
        info!(%network, %address, "wallet created");
        Ok(mnemonic)
    }

    /// Restore from a backup phrase. Invalid input fails before anything is
    /// derived or stored. Returns the restored address.
    pub async fn restore_wallet(&self, phrase: &str) -> WalletResult<String> {
        let mnemonic = Mnemonic::parse(phrase)?;
        let _ops = self.shared.ops.lock().await;
        let network = self.network();
        let address = derive_address(&mnemonic, network)?;

        self.persist_mnemonic(&mnemonic).await?;
        self.publish(WalletState::Ready(ReadyWallet::new(mnemonic, address.clone(), network)));
        info!(%network, %address, "wallet restored");
        self.schedule_refresh(std::time::Duration::ZERO);
        Ok(address)
    }

    /// Secret first, then the flag. A failed flag write puts back whatever
    /// secret was stored before, so a loaded wallet keeps its mnemonic.
    async fn persist_mnemonic(&self, mnemonic: &Mnemonic) -> WalletResult<()> {
        let previous = self.shared.secrets.get(secret::MNEMONIC).await?;
        self.shared.secrets.put(secret::MNEMONIC, mnemonic.phrase()).await?;
        if let Err(e) = self.shared.flags.set(flags::HAS_WALLET, true) {
            let rollback = match &previous {
                Some(phrase) => self.shared.secrets.put(secret::MNEMONIC, phrase).await,
                None => self.shared.secrets.delete(secret::MNEMONIC).await,
            };
            if let Err(cleanup) = rollback {
                warn!(error = %cleanup, "could not roll back stored mnemonic");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Erase the mnemonic and the wallet flag. Irreversible.
    ///
    /// The flag is cleared first: a secret without the flag is ignored on
    /// load, a flag without the secret is not.
    pub async fn delete_wallet(&self) -> WalletResult<()> {
        let _ops = self.shared.ops.lock().await;
        self.shared.flags.set(flags::HAS_WALLET, false)?;
        if let Err(e) = self.shared.secrets.delete(secret::MNEMONIC).await {
            if let Err(restore) = self.shared.flags.set(flags::HAS_WALLET, true) {
                warn!(error = %restore, "could not restore wallet flag");
            }
            return Err(e);
        }
        self.shared.scheduler.cancel();
        self.publish(WalletState::NoWallet);
        info!("wallet deleted");
        Ok(())
    }

    /// Change network. The mnemonic is untouched; the address is re-derived
    /// and the UTXO set starts empty until the follow-up refresh lands.
    /// Returns the new address when a wallet is loaded.
    pub async fn switch_network(&self, is_testnet: bool) -> WalletResult<Option<String>> {
        let _ops = self.shared.ops.lock().await;
        let network = Network::from_testnet_flag(is_testnet);
        self.shared.scheduler.cancel();

        let mnemonic = self.read().state.ready().ok().map(|w| w.mnemonic.clone());
        let next = match mnemonic {
            Some(m) => {
                let address = derive_address(&m, network)?;
                Some(ReadyWallet::new(m, address, network))
            }
            None => None,
        };

        self.shared.flags.set(flags::IS_TESTNET, is_testnet)?;
        self.shared.gateway.set_network(network);

        let address = next.as_ref().map(|w| w.address.clone());
        {
            let mut inner = self.write();
            inner.network = network;
            inner.epoch += 1;
            if let Some(wallet) = next {
                inner.state = WalletState::Ready(wallet);
            }
        }
        info!(%network, address = ?address, "network switched");
        if address.is_some() {
            self.schedule_refresh(std::time::Duration::ZERO);
        }
        Ok(address)
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Replace the UTXO set with the gateway's current view. On failure the
    /// previous set and balance stay as they were.
    pub async fn refresh_balance(&self) -> WalletResult<RefreshOutcome> {
        let (epoch, address) = {
            let inner = self.read();
            (inner.epoch, inner.state.ready()?.address.clone())
        };

        let utxos = match self.shared.gateway.utxos(&address).await {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, %address, "balance refresh failed");
                return Err(e);
            }
        };

        let balance = utxos
            .iter()
            .try_fold(0u64, |sum, u| sum.checked_add(u.value))
            .ok_or_else(|| WalletError::InvalidResponse("UTXO values overflow".into()))?;

        let mut inner = self.write();
        let current = inner.epoch;
        let outcome = match &mut inner.state {
            WalletState::Ready(w) if current == epoch && w.address == address => {
                w.balance = balance;
                w.utxos = utxos;
                w.refreshed_at = Some(Utc::now());
                debug!(balance = w.balance, utxos = w.utxos.len(), "balance refreshed");
                RefreshOutcome::Applied { balance: w.balance, utxo_count: w.utxos.len() }
            }
            _ => {
                debug!(%address, "stale refresh discarded");
                RefreshOutcome::Discarded
            }
        };
        Ok(outcome)
    }

    fn schedule_refresh(&self, delay: std::time::Duration) {
        let service = self.clone();
        self.shared.scheduler.schedule(delay, async move {
            if let Err(e) = service.refresh_balance().await {
                debug!(error = %e, "scheduled refresh failed");
            }
        });
    }

    // ========================================================================
    // Spend
    // ========================================================================

    /// Gateway's 6-block fee rate in sat/vB (fallback 2).
    pub async fn estimate_fee_rate(&self) -> u64 {
        self.shared.gateway.fee_rate().await
    }

    /// Build, sign and broadcast a payment, then schedule the delayed
    /// refresh. A rejected broadcast is returned as-is and never retried.
    pub async fn send(&self, to: &str, amount_sat: u64, fee_rate: Option<u64>) -> WalletResult<SendReceipt> {
        let _ops = self.shared.ops.lock().await;
        let (mnemonic, network, balance) = {
            let inner = self.read();
            let w = inner.state.ready()?;
            (w.mnemonic.clone(), w.network, w.balance)
        };
        if amount_sat < DUST_THRESHOLD {
            return Err(WalletError::AmountBelowDust { amount: amount_sat, dust: DUST_THRESHOLD });
        }
        if amount_sat > balance {
            return Err(WalletError::InsufficientFunds { required: amount_sat, available: balance });
        }

        let gateway = self.shared.gateway.as_ref();
        let signed = TransactionBuilder::new(gateway, &mnemonic, network)
            .build(to, amount_sat, fee_rate)
            .await?;
        drop(mnemonic);

        let txid = gateway.broadcast(&signed.hex).await?;
        if txid != signed.txid {
            warn!(gateway_txid = %txid, local_txid = %signed.txid, "gateway returned a different txid");
        }
        info!(%txid, amount_sat, fee = signed.fee, "transaction broadcast");

        self.schedule_refresh(self.shared.config.refresh_delay);
        Ok(SendReceipt {
            explorer_url: gateway.explorer_tx_url(&txid),
            txid,
            fee: signed.fee,
            change: signed.change,
            skipped: signed.skipped,
        })
    }

    // ========================================================================
    // History & receive
    // ========================================================================

    pub async fn transactions(&self) -> WalletResult<Vec<TransactionDetails>> {
        let address = self.address().ok_or(WalletError::NoWallet)?;
        let records = self.shared.gateway.transactions(&address).await?;
        records.iter().map(|r| TransactionDetails::from_record(r, &address)).collect()
    }

    pub async fn transaction(&self, txid: &str) -> WalletResult<Option<TransactionDetails>> {
        let address = self.address().ok_or(WalletError::NoWallet)?;
        let record = self.shared.gateway.transaction(txid).await?;
        record.map(|r| TransactionDetails::from_record(&r, &address)).transpose()
    }

    pub fn explorer_tx_url(&self, txid: &str) -> String {
        self.shared.gateway.explorer_tx_url(txid)
    }

    pub fn explorer_address_url(&self) -> WalletResult<String> {
        let address = self.address().ok_or(WalletError::NoWallet)?;
        Ok(self.shared.gateway.explorer_address_url(&address))
    }

    pub fn receive_uri(&self, request: &ReceiveRequest) -> WalletResult<String> {
        let address = self.address().ok_or(WalletError::NoWallet)?;
        Ok(request.to_uri(&address))
    }
}
