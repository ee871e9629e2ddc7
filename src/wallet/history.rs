//! Transaction history relative to the wallet address.

use serde::{Deserialize, Serialize};

use crate::error::{WalletError, WalletResult};
use crate::gateway::TransactionRecord;

fn checked_sum(mut values: impl Iterator<Item = u64>) -> WalletResult<u64> {
    values
        .try_fold(0u64, |sum, v| sum.checked_add(v))
        .ok_or_else(|| WalletError::InvalidResponse("output values overflow".into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub txid: String,
    /// Sum of outputs paying our address.
    pub received: u64,
    /// Sum of our prevouts spent by this transaction.
    pub sent: u64,
    pub fee: Option<u64>,
    pub confirmed: bool,
    pub timestamp: Option<u64>,
    pub block_height: Option<u32>,
}

impl TransactionDetails {
    /// Fails with `InvalidResponse` when the gateway's values do not fit
    /// in a u64 sum.
    pub fn from_record(record: &TransactionRecord, address: &str) -> WalletResult<Self> {
        let received = checked_sum(record.vout.iter().filter(|o| o.pays_to(address)).map(|o| o.value))?;
        let sent = checked_sum(
            record
                .vin
                .iter()
                .filter_map(|i| i.prevout.as_ref())
                .filter(|p| p.pays_to(address))
                .map(|p| p.value),
        )?;
        Ok(Self {
            txid: record.txid.clone(),
            received,
            sent,
            fee: record.fee,
            confirmed: record.status.confirmed,
            timestamp: record.status.block_time,
            block_height: record.status.block_height,
        })
    }

    /// received - sent, signed. Saturates at the i64 bounds.
    pub fn net(&self) -> i64 {
        let net = i128::from(self.received) - i128::from(self.sent);
        i64::try_from(net).unwrap_or(if net < 0 { i64::MIN } else { i64::MAX })
    }

    pub fn is_outgoing(&self) -> bool { self.sent > 0 }
}
