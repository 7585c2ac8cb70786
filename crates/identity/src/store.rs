//! Single-slot identity storage over an opaque key-value store.
//!
//! The persistence medium is injected as a [`KeyValueStore`]. Only one key,
//! [`IDENTITY_KEY`], is ever used; [`IdentitySlot`] turns its presence or
//! absence into an `Option<IdentityRecord>`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::record::IdentityRecord;

/// The one well-known key holding the bound identity.
pub const IDENTITY_KEY: &str = "user_identity";

/// Opaque string key-value persistence.
///
/// Deleting an absent key must succeed.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

#[async_trait]
impl<S> KeyValueStore for Box<S>
where
    S: KeyValueStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

/// In-process store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a bound identity.
    pub fn with_identity(name: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(IDENTITY_KEY.to_string(), name.into());
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Typed view of the identity key.
pub struct IdentitySlot<S> {
    store: S,
}

impl<S: KeyValueStore> IdentitySlot<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the bound identity, if any.
    pub async fn load(&self) -> Result<Option<IdentityRecord>, StoreError> {
        let value = self.store.get(IDENTITY_KEY).await?;
        debug!(present = value.is_some(), "Identity slot loaded");
        Ok(value.map(IdentityRecord::from_stored))
    }

    /// Persist `record` into the slot.
    pub async fn bind(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        self.store.set(IDENTITY_KEY, record.display_name()).await
    }

    /// Remove the bound identity.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(IDENTITY_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basics() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_slot_presence_is_option() {
        let slot = IdentitySlot::new(MemoryStore::new());
        assert_eq!(slot.load().await.unwrap(), None);

        let record = IdentityRecord::new("Alice").unwrap();
        slot.bind(&record).await.unwrap();
        assert_eq!(slot.load().await.unwrap(), Some(record));
        assert_eq!(
            slot.store().get(IDENTITY_KEY).await.unwrap(),
            Some("Alice".to_string())
        );

        slot.clear().await.unwrap();
        assert_eq!(slot.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_slot_through_shared_handle() {
        let store = Arc::new(MemoryStore::with_identity("Carol"));
        let slot = IdentitySlot::new(store.clone());

        assert_eq!(slot.load().await.unwrap().unwrap().display_name(), "Carol");
        slot.clear().await.unwrap();
        assert!(store.is_empty().await);
    }
}
