// # File Store
//
// File-backed implementation of KeyValueStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: temp file, then rename over the real file
// - Backup: the previous file is copied to `.backup` before each rename
// - Recovery: a file that fails to parse is replaced by its backup
// - If both are unreadable the store starts empty (the client re-discovers
//   the backend and asks the user to sign in again)
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "backend_ip": "192.168.1.3",
//     "access_token": "eyJ..."
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::KeyValueStore;

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// File-backed key-value store
///
/// Every mutation is written through to disk before the call returns.
///
/// # Example
///
/// ```rust,no_run
/// use hostwatch_core::store::FileStore;
/// use hostwatch_core::traits::KeyValueStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/data/hostwatch/store.json").await?;
///     store.set("backend_ip", "192.168.1.3").await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    entries: HashMap<String, String>,
    dirty: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    entries: HashMap<String, String>,
}

/// Why a store file could not be loaded
enum LoadError {
    /// File exists but does not parse
    Corrupt(String),
    /// File could not be read at all
    Io(Error),
}

impl FileStore {
    /// Open or create a file store
    ///
    /// Creates parent directories as needed and recovers from a corrupted
    /// file using its backup.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let entries = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                entries,
                dirty: false,
            })),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, String>, Error> {
        let reason = match Self::load(path).await {
            Ok(entries) => {
                tracing::debug!("Loaded store from file: {} entries", entries.len());
                return Ok(entries);
            }
            Err(LoadError::Io(e)) => return Err(e),
            Err(LoadError::Corrupt(reason)) => reason,
        };

        tracing::warn!(
            "Store file appears corrupted: {}. Attempting recovery from backup.",
            reason
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty store.");
            return Ok(HashMap::new());
        }

        match Self::load(&backup_path).await {
            Ok(entries) => {
                tracing::info!("Recovered store from backup: {} entries", entries.len());
                if let Err(e) = fs::copy(&backup_path, path).await {
                    tracing::error!("Failed to restore store file from backup: {}", e);
                }
                Ok(entries)
            }
            Err(LoadError::Corrupt(reason)) => {
                tracing::error!(
                    "Backup also corrupted: {}. Starting with empty store.",
                    reason
                );
                Ok(HashMap::new())
            }
            Err(LoadError::Io(e)) => {
                tracing::error!("Backup unreadable: {}. Starting with empty store.", e);
                Ok(HashMap::new())
            }
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, String>, LoadError> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Io(Error::store(format!(
                "Failed to read store file {}: {}",
                path.display(),
                e
            )))
        })?;

        let file: StoreFileFormat = serde_json::from_str(&content)
            .map_err(|e| LoadError::Corrupt(format!("{}: {}", path.display(), e)))?;

        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Loading anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.entries)
    }

    async fn write(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;

        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            entries: state.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::store(format!("Failed to serialize store: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        state.dirty = false;
        tracing::trace!("Store written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.state.read().await.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        {
            let mut state = self.state.write().await;
            state.entries.insert(key.to_string(), value.to_string());
            state.dirty = true;
        }
        self.write().await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        {
            let mut state = self.state.write().await;
            if state.entries.remove(key).is_none() {
                return Ok(());
            }
            state.dirty = true;
        }
        self.write().await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.state.read().await.entries.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty { self.write().await } else { Ok(()) }
    }
}
