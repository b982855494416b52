//! Persistence of the countdown trigger timestamp.
//!
//! Only one value is ever stored: the absolute time at which the running
//! countdown reaches zero. It is overwritten on start and cleared on stop or
//! completion, so a daemon restart can pick up a countdown in progress.

pub mod error;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use self::error::StoreError;

/// On-disk record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct TriggerRecord {
    #[serde(rename = "triggerAt")]
    trigger_at: i64,
}

/// Storage for the trigger timestamp.
#[allow(async_fn_in_trait)]
pub trait TriggerStore {
    /// Persists the trigger timestamp, replacing any previous value.
    async fn save(&self, trigger_at: i64) -> Result<(), StoreError>;

    /// Loads the trigger timestamp, if one is stored.
    async fn load(&self) -> Result<Option<i64>, StoreError>;

    /// Removes the stored trigger timestamp.
    async fn clear(&self) -> Result<(), StoreError>;
}

// ============================================================================
// FileTriggerStore
// ============================================================================

/// Stores the trigger timestamp as a small JSON file.
///
/// File IO goes through `tokio::fs`, which runs it on the blocking pool.
#[derive(Debug, Clone)]
pub struct FileTriggerStore {
    path: PathBuf,
}

impl FileTriggerStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl TriggerStore for FileTriggerStore {
    async fn save(&self, trigger_at: i64) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let json = serde_json::to_vec(&TriggerRecord { trigger_at }).map_err(|e| {
            self.write_error(std::io::Error::new(ErrorKind::InvalidData, e))
        })?;

        // Write then rename so a crash never leaves a half-written file
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| self.write_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!("トリガー時刻を保存しました: {} ({:?})", trigger_at, self.path);
        Ok(())
    }

    async fn load(&self) -> Result<Option<i64>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let record: TriggerRecord =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(record.trigger_at))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("トリガー時刻を削除しました ({:?})", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_error(e)),
        }
    }
}

// ============================================================================
// MemoryTriggerStore
// ============================================================================

/// In-memory store with failure injection, for tests.
#[derive(Debug, Default)]
pub struct MemoryTriggerStore {
    value: Mutex<Option<i64>>,
    should_fail: AtomicBool,
}

impl MemoryTriggerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `trigger_at`.
    #[must_use]
    pub fn with_value(trigger_at: i64) -> Self {
        Self {
            value: Mutex::new(Some(trigger_at)),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Returns the stored value without going through the trait.
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        *self.value.lock().unwrap()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock failure".to_string()));
        }
        Ok(())
    }
}

impl TriggerStore for MemoryTriggerStore {
    async fn save(&self, trigger_at: i64) -> Result<(), StoreError> {
        self.check()?;
        *self.value.lock().unwrap() = Some(trigger_at);
        Ok(())
    }

    async fn load(&self) -> Result<Option<i64>, StoreError> {
        self.check()?;
        Ok(*self.value.lock().unwrap())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.check()?;
        *self.value.lock().unwrap() = None;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod file_store_tests {
        use super::*;

        fn create_store() -> (tempfile::TempDir, FileTriggerStore) {
            let dir = tempfile::tempdir().unwrap();
            let store = FileTriggerStore::new(dir.path().join("state").join("trigger.json"));
            (dir, store)
        }

        #[tokio::test]
        async fn test_load_missing_is_none() {
            let (_dir, store) = create_store();
            assert_eq!(store.load().await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_save_then_load() {
            let (_dir, store) = create_store();
            store.save(1_700_000_000_000).await.unwrap();
            assert_eq!(store.load().await.unwrap(), Some(1_700_000_000_000));
        }

        #[tokio::test]
        async fn test_save_overwrites() {
            let (_dir, store) = create_store();
            store.save(1).await.unwrap();
            store.save(2).await.unwrap();
            assert_eq!(store.load().await.unwrap(), Some(2));
            assert!(!store.temp_path().exists());
        }

        #[tokio::test]
        async fn test_file_format() {
            let (_dir, store) = create_store();
            store.save(42).await.unwrap();
            let text = std::fs::read_to_string(store.path()).unwrap();
            assert_eq!(text, r#"{"triggerAt":42}"#);
        }

        #[tokio::test]
        async fn test_clear() {
            let (_dir, store) = create_store();
            store.save(42).await.unwrap();
            store.clear().await.unwrap();
            assert_eq!(store.load().await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_clear_missing_is_ok() {
            let (_dir, store) = create_store();
            assert!(store.clear().await.is_ok());
        }

        #[tokio::test]
        async fn test_corrupt_file_is_error() {
            let (_dir, store) = create_store();
            std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
            std::fs::write(store.path(), "not json").unwrap();

            let result = store.load().await;
            assert!(matches!(result, Err(StoreError::Corrupt { .. })));
        }
    }

    mod memory_store_tests {
        use super::*;

        #[tokio::test]
        async fn test_roundtrip() {
            let store = MemoryTriggerStore::new();
            store.save(10).await.unwrap();
            assert_eq!(store.load().await.unwrap(), Some(10));
            store.clear().await.unwrap();
            assert_eq!(store.value(), None);
        }

        #[tokio::test]
        async fn test_failure_injection() {
            let store = MemoryTriggerStore::with_value(5);
            store.set_should_fail(true);
            assert!(store.load().await.is_err());
            assert!(store.save(6).await.is_err());
            assert_eq!(store.value(), Some(5));
        }
    }
}
