//! BIP39 recovery phrase - 12 English words, 128 bits of entropy.
//!
//! The phrase is the sole root of trust. It is held in a zeroizing buffer
//! and never printed through `Debug`.

use bip39::Language;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{WalletError, WalletResult};

/// Word count of every phrase this wallet generates or restores.
pub const WORD_COUNT: usize = 12;

const ENTROPY_BYTES: usize = 16;

#[derive(Clone)]
pub struct Mnemonic {
    phrase: Zeroizing<String>,
}

impl Mnemonic {
    /// Generate a fresh phrase from the OS CSPRNG. Entropy failure is fatal.
    pub fn generate() -> WalletResult<Self> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
        OsRng
            .try_fill_bytes(&mut entropy[..])
            .map_err(|e| WalletError::Entropy(e.to_string()))?;

        let mnemonic = bip39::Mnemonic::from_entropy_in(Language::English, &entropy[..])
            .map_err(|e| WalletError::Entropy(format!("mnemonic generation failed: {e}")))?;

        Ok(Self { phrase: Zeroizing::new(mnemonic.to_string()) })
    }

    /// Parse user input. Whitespace and case are normalised before the
    /// word count and checksum are checked.
    pub fn parse(input: &str) -> WalletResult<Self> {
        let normalized = Zeroizing::new(normalize(input));
        let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
        if words != WORD_COUNT {
            return Err(WalletError::InvalidMnemonic(format!(
                "expected {} words, got {}",
                WORD_COUNT, words
            )));
        }
        bip39::Mnemonic::parse_in_normalized(Language::English, &normalized)
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
        Ok(Self { phrase: normalized })
    }

    /// Space-separated words, for backup display and secret persistence only.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.phrase.split(' ')
    }

    /// 64-byte BIP39 seed with an empty passphrase.
    pub fn to_seed(&self) -> WalletResult<Zeroizing<[u8; 64]>> {
        let m = bip39::Mnemonic::parse_in_normalized(Language::English, &self.phrase)
            .map_err(|e| WalletError::Derivation(format!("stored phrase no longer parses: {e}")))?;
        Ok(Zeroizing::new(m.to_seed("")))
    }
}

/// True when `input` is a 12-word English phrase with a valid checksum.
pub fn validate(input: &str) -> bool {
    Mnemonic::parse(input).is_ok()
}

impl PartialEq for Mnemonic {
    fn eq(&self, other: &Self) -> bool {
        *self.phrase == *other.phrase
    }
}

impl Eq for Mnemonic {}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Mnemonic(<redacted>)")
    }
}

fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
