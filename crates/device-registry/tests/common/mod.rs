//! Common test utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use device_registry::{RecordStore, RegistrationRecord};
use mockall::mock;
use registration_store::{MemoryStore, StoreResult};
use std::sync::Arc;
use tokio::sync::Barrier;

mock! {
    pub Store {}

    #[async_trait]
    impl RecordStore for Store {
        async fn find_by_reg_id(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>>;
        async fn save(&self, reg_id: &str) -> StoreResult<RegistrationRecord>;
        async fn delete(&self, record: &RegistrationRecord) -> StoreResult<()>;
        async fn list(&self, limit: usize) -> StoreResult<Vec<RegistrationRecord>>;
        async fn insert_if_absent(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>>;
        async fn delete_if_present(&self, reg_id: &str) -> StoreResult<bool>;
        async fn count(&self) -> StoreResult<usize>;
    }
}

/// Memory store whose lookups wait until `parties` lookups are in flight.
///
/// Forces every caller to observe the store before any of them writes.
pub struct LockstepStore {
    inner: MemoryStore,
    barrier: Barrier,
}

impl LockstepStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl RecordStore for LockstepStore {
    async fn find_by_reg_id(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>> {
        let found = self.inner.find_by_reg_id(reg_id).await?;
        self.barrier.wait().await;
        Ok(found)
    }

    async fn save(&self, reg_id: &str) -> StoreResult<RegistrationRecord> {
        self.inner.save(reg_id).await
    }

    async fn delete(&self, record: &RegistrationRecord) -> StoreResult<()> {
        self.inner.delete(record).await
    }

    async fn list(&self, limit: usize) -> StoreResult<Vec<RegistrationRecord>> {
        self.inner.list(limit).await
    }

    async fn insert_if_absent(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>> {
        self.inner.insert_if_absent(reg_id).await
    }

    async fn delete_if_present(&self, reg_id: &str) -> StoreResult<bool> {
        self.inner.delete_if_present(reg_id).await
    }

    async fn count(&self) -> StoreResult<usize> {
        self.inner.count().await
    }
}

/// Build `n` records with distinct tokens.
pub fn records(n: u64) -> Vec<RegistrationRecord> {
    (1..=n)
        .map(|id| RegistrationRecord::new(id, format!("token-{}", id)))
        .collect()
}

/// Shared memory store for tests that inspect store contents directly.
pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}
