//! Typed Esplora records. Validated at the gateway boundary by serde so the
//! rest of the crate never touches untyped JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unspent output owned by the wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    #[serde(default)]
    pub status: TxStatus,
}

impl Utxo {
    pub fn confirmed(&self) -> bool { self.status.confirmed }

    pub fn outpoint(&self) -> String { format!("{}:{}", self.txid, self.vout) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u32>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub txid: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub locktime: u32,
    pub vin: Vec<TxInputRecord>,
    pub vout: Vec<TxOutputRecord>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub weight: u64,
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub status: TxStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInputRecord {
    pub txid: String,
    pub vout: u32,
    /// Absent for coinbase inputs.
    #[serde(default)]
    pub prevout: Option<TxOutputRecord>,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(default)]
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutputRecord {
    pub scriptpubkey: String,
    #[serde(default)]
    pub scriptpubkey_type: Option<String>,
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

impl TxOutputRecord {
    pub fn pays_to(&self, address: &str) -> bool {
        self.scriptpubkey_address.as_deref() == Some(address)
    }
}

/// `GET /fee-estimates`: confirmation target (blocks) → sat/vB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeEstimates(pub HashMap<String, f64>);

impl FeeEstimates {
    /// sat/vB for `target`, rounded up. None when missing or not a positive finite number.
    pub fn rate_for(&self, target: &str) -> Option<u64> {
        self.0
            .get(target)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .map(|r| r.ceil() as u64)
    }
}
