//! Persistence: the secret store (mnemonic) and plain flags.

mod flags;
mod secret;

pub use flags::{FileFlagStore, FlagStore, MemoryFlagStore};
pub use secret::{MemorySecretStore, ObfuscatedFileSecretStore, SecretStore};
