use serde::{Deserialize, Serialize};

/// Active chain. Selects the BIP84 coin type, the address HRP and the
/// gateway base URL. Persisted as the "is testnet" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network { #[default] Mainnet, Testnet }

impl Network {
    pub fn from_testnet_flag(is_testnet: bool) -> Self {
        if is_testnet { Network::Testnet } else { Network::Mainnet }
    }

    pub fn is_testnet(&self) -> bool { matches!(self, Network::Testnet) }

    pub fn as_str(&self) -> &'static str {
        match self { Network::Mainnet => "mainnet", Network::Testnet => "testnet" }
    }

    /// BIP44 coin type: 0' mainnet, 1' for every test chain.
    pub fn coin_type(&self) -> u32 {
        match self { Network::Mainnet => 0, Network::Testnet => 1 }
    }

    /// The single receive path this wallet ever uses.
    pub fn derivation_path(&self) -> &'static str {
        match self { Network::Mainnet => "m/84'/0'/0'/0/0", Network::Testnet => "m/84'/1'/0'/0/0" }
    }

    pub fn to_bitcoin(&self) -> bitcoin::Network {
        match self { Network::Mainnet => bitcoin::Network::Bitcoin, Network::Testnet => bitcoin::Network::Testnet }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}
