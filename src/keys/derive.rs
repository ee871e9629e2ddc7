//! BIP32/BIP84 derivation of the wallet's single P2WPKH key.
//!
//! Pure function of (mnemonic, network). Restoring a wallet relies on this
//! producing the same address every time.

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use bitcoin::{Address, CompressedPublicKey, ScriptBuf};
use std::str::FromStr;

use super::{Mnemonic, Network};
use crate::error::{WalletError, WalletResult};

/// Address-level key material. The secret half is wiped on drop and must
/// not outlive a single signing pass.
pub struct DerivedKey {
    pub address: Address,
    pub public_key: CompressedPublicKey,
    pub network: Network,
    secret_key: SecretKey,
}

impl DerivedKey {
    pub fn secret_key(&self) -> &SecretKey { &self.secret_key }

    pub fn script_pubkey(&self) -> ScriptBuf { self.address.script_pubkey() }

    pub fn public_key_hex(&self) -> String { hex::encode(self.public_key.to_bytes()) }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("address", &self.address.to_string())
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Seed → BIP32 root → fixed BIP84 path → P2WPKH.
pub fn derive_key(mnemonic: &Mnemonic, network: Network) -> WalletResult<DerivedKey> {
    let seed = mnemonic.to_seed()?;
    let secp = Secp256k1::new();

    let root = Xpriv::new_master(network.to_bitcoin(), &seed[..])
        .map_err(|e| WalletError::Derivation(format!("master key: {}", e)))?;
    let path = DerivationPath::from_str(network.derivation_path())
        .map_err(|e| WalletError::Derivation(format!("path: {}", e)))?;
    let child = root
        .derive_priv(&secp, &path)
        .map_err(|e| WalletError::Derivation(format!("child key: {}", e)))?;

    let secret_key = child.private_key;
    let public_key = CompressedPublicKey(PublicKey::from_secret_key(&secp, &secret_key));
    let address = Address::p2wpkh(&public_key, network.to_bitcoin());

    Ok(DerivedKey { address, public_key, network, secret_key })
}

/// Address only; the key material is dropped before returning.
pub fn derive_address(mnemonic: &Mnemonic, network: Network) -> WalletResult<String> {
    Ok(derive_key(mnemonic, network)?.address.to_string())
}

/// Parse a destination address and require it to belong to `network`.
pub fn parse_address(address: &str, network: Network) -> WalletResult<Address> {
    Address::from_str(address.trim())
        .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?
        .require_network(network.to_bitcoin())
        .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))
}
