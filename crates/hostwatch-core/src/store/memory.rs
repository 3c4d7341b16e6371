// # Memory Store
//
// In-memory implementation of KeyValueStore.
//
// Nothing survives a restart: the first discovery after a restart has no
// cached host and walks the candidate list, and any session is gone.
// Used in tests, in the web build and in the demo.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::KeyValueStore;

/// In-memory key-value store
///
/// Cloning shares the underlying map.
///
/// # Example
///
/// ```rust,no_run
/// use hostwatch_core::store::MemoryStore;
/// use hostwatch_core::traits::KeyValueStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     store.set("backend_ip", "192.168.1.3").await?;
///     assert_eq!(store.get("backend_ip").await?.as_deref(), Some("192.168.1.3"));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.set("backend_ip", "10.0.2.2").await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get("backend_ip").await.unwrap().as_deref(),
            Some("10.0.2.2")
        );

        store.remove("backend_ip").await.unwrap();
        assert_eq!(store.get("backend_ip").await.unwrap(), None);

        // removing a missing key is fine
        store.remove("backend_ip").await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryStore::with_entries([("access_token", "abc")]);
        let other = store.clone();
        other.set("user", "{}").await.unwrap();

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["access_token", "user"]);
    }
}
