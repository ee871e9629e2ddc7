//! Key and path constants
//!
//! Centralized registry for storage keys and Esplora endpoint paths.

/// Secret store keys
pub mod secret {
    pub const MNEMONIC: &str = "wallet_mnemonic";
}

/// Non-secret flag keys
pub mod flags {
    pub const HAS_WALLET: &str = "has_wallet";
    pub const IS_TESTNET: &str = "is_testnet";
}

/// Esplora gateway endpoints, relative to the network's base URL
pub mod esplora {
    pub const TX: &str = "/tx";
    pub const FEE_ESTIMATES: &str = "/fee-estimates";

    pub fn address_utxos(address: &str) -> String { format!("/address/{}/utxo", address) }
    pub fn address_txs(address: &str) -> String { format!("/address/{}/txs", address) }
    pub fn tx(txid: &str) -> String { format!("/tx/{}", txid) }
    pub fn tx_hex(txid: &str) -> String { format!("/tx/{}/hex", txid) }
}

/// Confirmation target used as the default fee rate
pub const DEFAULT_CONFIRMATION_TARGET: &str = "6";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esplora_paths() {
        assert_eq!(esplora::address_utxos("bc1qx"), "/address/bc1qx/utxo");
        assert_eq!(esplora::address_txs("bc1qx"), "/address/bc1qx/txs");
        assert_eq!(esplora::tx("ab"), "/tx/ab");
        assert_eq!(esplora::tx_hex("ab"), "/tx/ab/hex");
    }
}
