// # Key-Value Store Implementations
//
// Implementations of the KeyValueStore trait for different persistence
// strategies.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::traits::KeyValueStore;

/// Open the store described by `config`
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, crate::Error> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::File { path } => Ok(Arc::new(FileStore::new(path).await?)),
    }
}
