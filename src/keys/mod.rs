//! Keys - Mnemonic generation/validation and deterministic address derivation.
//!
//! No I/O. The master mnemonic only leaves this layer as a phrase for the
//! secret store or the one-time backup screen.

mod derive;
mod mnemonic;
mod network;

pub use derive::{derive_address, derive_key, parse_address, DerivedKey};
pub use mnemonic::{validate as validate_mnemonic, Mnemonic, WORD_COUNT};
pub use network::Network;
