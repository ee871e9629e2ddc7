//! Transaction Builder & Signer
//!
//! Single-recipient P2WPKH spends from the wallet's one address:
//!
//! 1. Pull a fresh UTXO snapshot (never the cached set).
//! 2. Take inputs oldest-first until `amount + DUST_RESERVE` is covered.
//!    Each input's previous transaction is fetched and checked; a failed
//!    fetch skips that UTXO and is reported in `skipped`.
//! 3. Fee = `(inputs*68 + 2*31 + 10) * rate`, or `FALLBACK_FEE` with no rate.
//! 4. Change above dust goes back to our own address, otherwise it is
//!    absorbed into the fee.
//! 5. Sign every input with the single derived key, serialize to hex.
//!
//! The signing key is derived after the last network call and dropped
//! before `build` returns.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::{deserialize_hex, serialize_hex};
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{WalletError, WalletResult};
use crate::gateway::{LedgerGateway, Utxo};
use crate::keys::{derive_address, derive_key, parse_address, Mnemonic, Network};

/// Outputs at or below this are never created.
pub const DUST_THRESHOLD: u64 = 546;
/// Headroom over the amount before input accumulation stops.
pub const DUST_RESERVE: u64 = 1_000;
/// Fee when no rate is supplied.
pub const FALLBACK_FEE: u64 = 1_000;

const INPUT_VBYTES: u64 = 68;
const OUTPUT_VBYTES: u64 = 31;
const OVERHEAD_VBYTES: u64 = 10;
const ESTIMATED_OUTPUTS: u64 = 2;

/// Approximate fee for `input_count` P2WPKH inputs and two outputs.
///
/// `(inputs*68 + 2*31 + 10) * rate`: the whole vbyte estimate is scaled by
/// the rate, not only the overhead term.
pub fn estimate_fee(input_count: usize, fee_rate: Option<u64>) -> u64 {
    match fee_rate {
        Some(rate) => {
            let vbytes = input_count as u64 * INPUT_VBYTES + ESTIMATED_OUTPUTS * OUTPUT_VBYTES + OVERHEAD_VBYTES;
            vbytes.saturating_mul(rate)
        }
        None => FALLBACK_FEE,
    }
}

/// How the selected inputs split into payment, fee and change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendPlan {
    pub input_sum: u64,
    pub amount: u64,
    pub fee: u64,
    /// Zero when below dust (absorbed into the fee).
    pub change: u64,
}

impl SpendPlan {
    pub fn new(input_sum: u64, input_count: usize, amount: u64, fee_rate: Option<u64>) -> WalletResult<Self> {
        let fee = estimate_fee(input_count, fee_rate);
        let required = amount.saturating_add(fee);
        let leftover = input_sum
            .checked_sub(required)
            .ok_or(WalletError::InsufficientFunds { required, available: input_sum })?;
        if leftover > DUST_THRESHOLD {
            Ok(Self { input_sum, amount, fee, change: leftover })
        } else {
            Ok(Self { input_sum, amount, fee: fee + leftover, change: 0 })
        }
    }

    pub fn has_change(&self) -> bool { self.change > 0 }

    pub fn output_count(&self) -> usize { if self.has_change() { 2 } else { 1 } }
}

/// A UTXO left out because its previous transaction could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInput {
    pub outpoint: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedTransaction {
    pub txid: String,
    pub hex: String,
    pub fee: u64,
    pub change: u64,
    pub inputs: Vec<String>,
    pub outputs: usize,
    pub skipped: Vec<SkippedInput>,
}

struct FundingInput {
    outpoint: OutPoint,
    value: u64,
}

pub struct TransactionBuilder<'a> {
    gateway: &'a dyn LedgerGateway,
    mnemonic: &'a Mnemonic,
    network: Network,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(gateway: &'a dyn LedgerGateway, mnemonic: &'a Mnemonic, network: Network) -> Self {
        Self { gateway, mnemonic, network }
    }

    pub async fn build(&self, to: &str, amount_sat: u64, fee_rate: Option<u64>) -> WalletResult<SignedTransaction> {
        if amount_sat < DUST_THRESHOLD {
            return Err(WalletError::AmountBelowDust { amount: amount_sat, dust: DUST_THRESHOLD });
        }
        let recipient = parse_address(to, self.network)?.script_pubkey();
        let own_address = derive_address(self.mnemonic, self.network)?;
        let own_spk = parse_address(&own_address, self.network)?.script_pubkey();

        let snapshot = self.gateway.utxos(&own_address).await?;
        if snapshot.is_empty() {
            return Err(WalletError::NoFunds);
        }

        let target = amount_sat.saturating_add(DUST_RESERVE);
        let mut funding = Vec::new();
        let mut skipped = Vec::new();
        let mut input_sum = 0u64;
        for utxo in &snapshot {
            if input_sum >= target {
                break;
            }
            match self.fetch_funding(utxo, &own_spk).await {
                Ok(input) => {
                    input_sum = input_sum
                        .checked_add(input.value)
                        .ok_or_else(|| WalletError::InvalidResponse("UTXO values overflow".into()))?;
                    funding.push(input);
                }
                Err(reason) => {
                    warn!(outpoint = %utxo.outpoint(), %reason, "skipping input");
                    skipped.push(SkippedInput { outpoint: utxo.outpoint(), reason });
                }
            }
        }
        if funding.is_empty() {
            return Err(WalletError::NoFunds);
        }

        let plan = SpendPlan::new(input_sum, funding.len(), amount_sat, fee_rate)?;
        debug!(inputs = funding.len(), input_sum, fee = plan.fee, change = plan.change, "spend plan");

        let mut tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: funding
                .iter()
                .map(|f| TxIn {
                    previous_output: f.outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: vec![TxOut { value: Amount::from_sat(amount_sat), script_pubkey: recipient }],
        };
        if plan.has_change() {
            tx.output.push(TxOut { value: Amount::from_sat(plan.change), script_pubkey: own_spk.clone() });
        }

        self.sign(&mut tx, &funding, &own_spk)?;

        let txid = tx.compute_txid().to_string();
        info!(%txid, amount_sat, fee = plan.fee, "transaction signed");
        Ok(SignedTransaction {
            txid,
            hex: serialize_hex(&tx),
            fee: plan.fee,
            change: plan.change,
            inputs: funding.iter().map(|f| f.outpoint.to_string()).collect(),
            outputs: tx.output.len(),
            skipped,
        })
    }

    /// Previous transaction must hash to the UTXO's txid and its output must
    /// be ours with the advertised value.
    async fn fetch_funding(&self, utxo: &Utxo, own_spk: &ScriptBuf) -> Result<FundingInput, String> {
        let txid = Txid::from_str(&utxo.txid).map_err(|e| format!("txid: {}", e))?;
        let raw = self.gateway.transaction_hex(&utxo.txid).await.map_err(|e| e.to_string())?;
        let prev: Transaction = deserialize_hex(raw.trim()).map_err(|e| format!("decode: {}", e))?;
        if prev.compute_txid() != txid {
            return Err("previous transaction does not match txid".into());
        }
        let out = prev
            .output
            .get(utxo.vout as usize)
            .ok_or_else(|| format!("no output {}", utxo.vout))?;
        if out.script_pubkey != *own_spk {
            return Err("output is not ours".into());
        }
        if out.value.to_sat() != utxo.value {
            return Err(format!("value mismatch: {} vs {}", out.value.to_sat(), utxo.value));
        }
        Ok(FundingInput { outpoint: OutPoint { txid, vout: utxo.vout }, value: utxo.value })
    }

    fn sign(&self, tx: &mut Transaction, funding: &[FundingInput], own_spk: &ScriptBuf) -> WalletResult<()> {
        let key = derive_key(self.mnemonic, self.network)?;
        if key.script_pubkey() != *own_spk {
            return Err(WalletError::Derivation("signing key does not match wallet address".into()));
        }
        let secp = Secp256k1::signing_only();
        let mut cache = SighashCache::new(tx);
        for (i, input) in funding.iter().enumerate() {
            let sighash = cache
                .p2wpkh_signature_hash(i, own_spk, Amount::from_sat(input.value), EcdsaSighashType::All)
                .map_err(|e| WalletError::Derivation(format!("sighash {}: {}", i, e)))?;
            let msg = Message::from_digest(sighash.to_byte_array());
            let signature = bitcoin::ecdsa::Signature {
                signature: secp.sign_ecdsa(&msg, key.secret_key()),
                sighash_type: EcdsaSighashType::All,
            };
            let witness = cache
                .witness_mut(i)
                .ok_or_else(|| WalletError::Derivation(format!("no input {}", i)))?;
            *witness = Witness::p2wpkh(&signature, &key.public_key.0);
        }
        Ok(())
    }
}
