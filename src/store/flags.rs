//! Non-secret boolean flags ("has wallet", "is testnet").

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{WalletError, WalletResult};

pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> WalletResult<Option<bool>>;
    fn set(&self, key: &str, value: bool) -> WalletResult<()>;

    fn get_or(&self, key: &str, default: bool) -> WalletResult<bool> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

#[derive(Default)]
pub struct MemoryFlagStore {
    flags: Mutex<BTreeMap<String, bool>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self { Self::default() }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> WalletResult<Option<bool>> {
        let flags = self.flags.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        Ok(flags.get(key).copied())
    }

    fn set(&self, key: &str, value: bool) -> WalletResult<()> {
        let mut flags = self.flags.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        flags.insert(key.to_string(), value);
        Ok(())
    }
}

/// Flags as a flat JSON object on disk. Writes go through a temp file + rename.
pub struct FileFlagStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn load(&self) -> WalletResult<BTreeMap<String, bool>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| WalletError::Storage(format!("flags read: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| WalletError::Storage(format!("flags json: {e}")))
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, key: &str) -> WalletResult<Option<bool>> {
        let _guard = self.lock.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        Ok(self.load()?.get(key).copied())
    }

    fn set(&self, key: &str, value: bool) -> WalletResult<()> {
        let _guard = self.lock.lock().map_err(|_| WalletError::Storage("lock".into()))?;
        let mut flags = self.load()?;
        flags.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WalletError::Storage(format!("flags mkdir: {e}")))?;
        }
        let json = serde_json::to_string_pretty(&flags)
            .map_err(|e| WalletError::Storage(format!("flags json: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| WalletError::Storage(format!("flags write: {e}")))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| WalletError::Storage(format!("flags rename: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::flags;
    use tempfile::TempDir;

    #[test]
    fn test_memory_flags() {
        let store = MemoryFlagStore::new();
        assert_eq!(store.get(flags::HAS_WALLET).unwrap(), None);
        assert!(!store.get_or(flags::HAS_WALLET, false).unwrap());
        store.set(flags::HAS_WALLET, true).unwrap();
        assert!(store.get_or(flags::HAS_WALLET, false).unwrap());
    }

    #[test]
    fn test_file_flags_persist() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("flags.json");
        FileFlagStore::new(&path).set(flags::IS_TESTNET, true).unwrap();
        FileFlagStore::new(&path).set(flags::HAS_WALLET, false).unwrap();

        let store = FileFlagStore::new(&path);
        assert_eq!(store.get(flags::IS_TESTNET).unwrap(), Some(true));
        assert_eq!(store.get(flags::HAS_WALLET).unwrap(), Some(false));
    }

    #[test]
    fn test_file_flags_leave_no_temp_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("flags.json");
        let store = FileFlagStore::new(&path);
        store.set(flags::HAS_WALLET, true).unwrap();
        store.set(flags::HAS_WALLET, false).unwrap();

        assert!(!path.with_extension("tmp").exists());
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: BTreeMap<String, bool> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.get(flags::HAS_WALLET), Some(&false));
    }

    #[test]
    fn test_corrupted_flags_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("flags.json");
        std::fs::write(&path, "{broken").unwrap();
        assert!(matches!(FileFlagStore::new(&path).get(flags::HAS_WALLET), Err(WalletError::Storage(_))));
    }
}
