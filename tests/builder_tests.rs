//! Transaction builder against an in-memory gateway.
//!
//! Covers:
//! 1. Dust boundary on the payment amount
//! 2. Change suppression vs change output
//! 3. NoFunds / InsufficientFunds
//! 4. Skipped inputs when a previous transaction can't be used
//! 5. Oldest-first accumulation
//! 6. Every input carries a valid P2WPKH signature

mod common;

use beewallet::error::WalletError;
use beewallet::gateway::{TxStatus, Utxo};
use beewallet::keys::{derive_key, parse_address, Mnemonic, Network};
use beewallet::wallet::{TransactionBuilder, DUST_THRESHOLD};
use bitcoin::consensus::encode::deserialize_hex;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Amount, Transaction};
use common::{MockGateway, MAINNET_ADDR, MAINNET_RECIPIENT, TESTNET_ADDR, TEST_MNEMONIC};

fn mnemonic() -> Mnemonic {
    Mnemonic::parse(TEST_MNEMONIC).expect("test mnemonic")
}

fn decode(hex: &str) -> Transaction {
    deserialize_hex(hex).expect("signed hex decodes")
}

#[tokio::test]
async fn dust_boundary() {
    let gateway = MockGateway::new();
    gateway.fund(MAINNET_ADDR, Network::Mainnet, 10_000);
    let m = mnemonic();
    let builder = TransactionBuilder::new(&*gateway, &m, Network::Mainnet);

    let err = builder.build(MAINNET_RECIPIENT, DUST_THRESHOLD - 1, None).await.unwrap_err();
    assert!(matches!(err, WalletError::AmountBelowDust { amount: 545, dust: 546 }));
    assert!(err.is_user_input());

    let signed = builder.build(MAINNET_RECIPIENT, DUST_THRESHOLD, None).await.unwrap();
    assert_eq!(signed.fee, 1_000);
    assert_eq!(signed.change, 10_000 - 546 - 1_000);
}

#[tokio::test]
async fn change_below_dust_is_absorbed() {
    let gateway = MockGateway::new();
    gateway.fund(MAINNET_ADDR, Network::Mainnet, 20_000 + 1_000 + 500);
    let m = mnemonic();
    let signed = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 20_000, None)
        .await
        .unwrap();

    assert_eq!(signed.outputs, 1);
    assert_eq!(signed.change, 0);
    assert_eq!(signed.fee, 1_500);
    let tx = decode(&signed.hex);
    assert_eq!(tx.output.len(), 1);
    assert_eq!(tx.output[0].value, Amount::from_sat(20_000));
}

#[tokio::test]
async fn change_above_dust_returns_to_own_address() {
    let gateway = MockGateway::new();
    gateway.fund(MAINNET_ADDR, Network::Mainnet, 20_000 + 280 + 10_000);
    let m = mnemonic();
    let signed = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 20_000, Some(2))
        .await
        .unwrap();

    assert_eq!(signed.outputs, 2);
    assert_eq!(signed.fee, 280);
    assert_eq!(signed.change, 10_000);
    let tx = decode(&signed.hex);
    let own = parse_address(MAINNET_ADDR, Network::Mainnet).unwrap().script_pubkey();
    let to = parse_address(MAINNET_RECIPIENT, Network::Mainnet).unwrap().script_pubkey();
    assert_eq!(tx.output[0].script_pubkey, to);
    assert_eq!(tx.output[1].script_pubkey, own);
    assert_eq!(tx.output[1].value, Amount::from_sat(10_000));
}

#[tokio::test]
async fn insufficient_funds() {
    let gateway = MockGateway::new();
    gateway.fund(MAINNET_ADDR, Network::Mainnet, 20_500);
    let m = mnemonic();
    let err = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 20_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { required: 21_000, available: 20_500 }));
    assert!(err.is_funds());
}

#[tokio::test]
async fn empty_snapshot_is_no_funds() {
    let gateway = MockGateway::new();
    let m = mnemonic();
    let err = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 5_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NoFunds));
}

#[tokio::test]
async fn all_inputs_skipped_is_no_funds() {
    let gateway = MockGateway::new();
    let txid = gateway.fund(MAINNET_ADDR, Network::Mainnet, 50_000);
    gateway.break_hex(&txid);
    let m = mnemonic();
    let err = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 5_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NoFunds));
}

#[tokio::test]
async fn failed_prev_fetch_skips_input() {
    let gateway = MockGateway::new();
    let broken = gateway.fund(MAINNET_ADDR, Network::Mainnet, 30_000);
    let good = gateway.fund(MAINNET_ADDR, Network::Mainnet, 30_000);
    gateway.break_hex(&broken);
    let m = mnemonic();

    let signed = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 20_000, None)
        .await
        .unwrap();

    assert_eq!(signed.skipped.len(), 1);
    assert_eq!(signed.skipped[0].outpoint, format!("{}:0", broken));
    assert_eq!(signed.inputs, vec![format!("{}:0", good)]);
}

#[tokio::test]
async fn advertised_value_mismatch_is_skipped() {
    let gateway = MockGateway::new();
    let txid = gateway.fund(MAINNET_ADDR, Network::Mainnet, 30_000);
    gateway.set_utxos(
        MAINNET_ADDR,
        vec![Utxo { txid, vout: 0, value: 90_000, status: TxStatus::default() }],
    );
    let m = mnemonic();
    let err = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 20_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NoFunds));
}

#[tokio::test]
async fn accumulates_oldest_first_until_reserve() {
    let gateway = MockGateway::new();
    let txids: Vec<String> = (0..5).map(|_| gateway.fund(MAINNET_ADDR, Network::Mainnet, 10_000)).collect();
    let m = mnemonic();

    // 15_000 + 1_000 reserve needs two inputs
    let signed = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 15_000, None)
        .await
        .unwrap();

    assert_eq!(signed.inputs, vec![format!("{}:0", txids[0]), format!("{}:0", txids[1])]);
    assert_eq!(signed.fee, 1_000);
    assert_eq!(signed.change, 4_000);
}

#[tokio::test]
async fn every_input_is_signed() {
    let gateway = MockGateway::new();
    for _ in 0..3 {
        gateway.fund(MAINNET_ADDR, Network::Mainnet, 8_000);
    }
    let m = mnemonic();
    let signed = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, 20_000, Some(1))
        .await
        .unwrap();

    let tx = decode(&signed.hex);
    assert_eq!(tx.compute_txid().to_string(), signed.txid);
    assert_eq!(tx.input.len(), 3);

    let key = derive_key(&m, Network::Mainnet).unwrap();
    let own = key.script_pubkey();
    let secp = Secp256k1::verification_only();
    let mut cache = SighashCache::new(&tx);
    for (i, input) in tx.input.iter().enumerate() {
        assert!(input.script_sig.is_empty());
        assert_eq!(input.witness.len(), 2);
        let sig = bitcoin::ecdsa::Signature::from_slice(input.witness.nth(0).unwrap()).unwrap();
        let pk = PublicKey::from_slice(input.witness.nth(1).unwrap()).unwrap();
        assert_eq!(pk, key.public_key.0);
        assert_eq!(sig.sighash_type, EcdsaSighashType::All);

        let sighash = cache
            .p2wpkh_signature_hash(i, &own, Amount::from_sat(8_000), EcdsaSighashType::All)
            .unwrap();
        let msg = Message::from_digest(sighash.to_byte_array());
        secp.verify_ecdsa(&msg, &sig.signature, &pk).expect("valid signature");
    }
}

#[tokio::test]
async fn recipient_on_wrong_network_rejected() {
    let gateway = MockGateway::new();
    gateway.fund(MAINNET_ADDR, Network::Mainnet, 50_000);
    let m = mnemonic();
    let err = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(TESTNET_ADDR, 10_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}

#[tokio::test]
async fn overflowing_input_values_rejected() {
    let gateway = MockGateway::new();
    let huge = u64::MAX / 2 + 1;
    gateway.fund(MAINNET_ADDR, Network::Mainnet, huge);
    gateway.fund(MAINNET_ADDR, Network::Mainnet, huge);
    let m = mnemonic();
    let err = TransactionBuilder::new(&*gateway, &m, Network::Mainnet)
        .build(MAINNET_RECIPIENT, u64::MAX - 500, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidResponse(_)));
}
