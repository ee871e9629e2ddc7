//! Secret store - opaque string persistence for the mnemonic.
//!
//! On device the shell plugs in the OS keystore. Off device the obfuscated
//! file fallback is used: values are XOR-ed with a SHA-256 keystream of a
//! fixed salt and base64-encoded. That is reversible by anyone holding the
//! binary; the format is kept stable so existing secrets stay readable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zeroize::Zeroizing;

use crate::error::{WalletError, WalletResult};

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> WalletResult<()>;
    async fn get(&self, key: &str) -> WalletResult<Option<Zeroizing<String>>>;
    async fn delete(&self, key: &str) -> WalletResult<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<BTreeMap<String, Zeroizing<String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn put(&self, key: &str, value: &str) -> WalletResult<()> {
        let mut entries = self.entries.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        entries.insert(key.to_string(), Zeroizing::new(value.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> WalletResult<Option<Zeroizing<String>>> {
        let entries = self.entries.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        Ok(entries.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        let mut entries = self.entries.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        entries.remove(key);
        Ok(())
    }
}

const OBFUSCATION_SALT: &[u8] = b"beewallet-secure-store-fallback";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SecretFile {
    entries: BTreeMap<String, String>,
}

/// JSON file of obfuscated entries. Writes go through a temp file + rename.
pub struct ObfuscatedFileSecretStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ObfuscatedFileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn load(&self) -> WalletResult<SecretFile> {
        if !self.path.exists() {
            return Ok(SecretFile::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| WalletError::Storage(format!("secret read: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| WalletError::Storage(format!("secret json: {e}")))
    }

    fn save(&self, file: &SecretFile) -> WalletResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WalletError::Storage(format!("secret mkdir: {e}")))?;
        }
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| WalletError::Storage(format!("secret json: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| WalletError::Storage(format!("secret write: {e}")))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| WalletError::Storage(format!("secret rename: {e}")))
    }
}

#[async_trait]
impl SecretStore for ObfuscatedFileSecretStore {
    async fn put(&self, key: &str, value: &str) -> WalletResult<()> {
        let _guard = self.lock.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        let mut file = self.load()?;
        file.entries.insert(key.to_string(), obfuscate(value.as_bytes()));
        self.save(&file)
    }

    async fn get(&self, key: &str) -> WalletResult<Option<Zeroizing<String>>> {
        let _guard = self.lock.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        let file = self.load()?;
        file.entries.get(key).map(|v| deobfuscate(v)).transpose()
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        let _guard = self.lock.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        let mut file = self.load()?;
        if file.entries.remove(key).is_some() {
            self.save(&file)?;
        }
        Ok(())
    }
}

fn keystream(len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(len + 32));
    let mut counter: u32 = 0;
    while out.len() < len {
        let mut h = Sha256::new();
        h.update(OBFUSCATION_SALT);
        h.update(counter.to_be_bytes());
        out.extend_from_slice(&h.finalize());
        counter += 1;
    }
    out.truncate(len);
    out
}

fn obfuscate(plain: &[u8]) -> String {
    use base64::Engine;
    let ks = keystream(plain.len());
    let mixed: Zeroizing<Vec<u8>> = Zeroizing::new(plain.iter().zip(ks.iter()).map(|(p, k)| p ^ k).collect());
    base64::engine::general_purpose::STANDARD.encode(&mixed[..])
}

fn deobfuscate(encoded: &str) -> WalletResult<Zeroizing<String>> {
    use base64::Engine;
    let mixed = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| WalletError::Storage(format!("base64: {e}")))?;
    let ks = keystream(mixed.len());
    let plain: Vec<u8> = mixed.iter().zip(ks.iter()).map(|(m, k)| m ^ k).collect();
    String::from_utf8(plain)
        .map(Zeroizing::new)
        .map_err(|e| WalletError::Storage(format!("secret utf8: {e}")))
}
