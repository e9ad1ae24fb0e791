//! In-memory record store.

use crate::error::StoreError;
use crate::store::{RecordStore, StoreResult};
use crate::types::RegistrationRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Records indexed by store-assigned id, with a secondary index by `reg_id`.
///
/// Nothing here enforces one record per `reg_id`; that is up to the caller.
#[derive(Debug, Clone)]
pub(crate) struct RecordTable {
    /// Next id to hand out. Ids are never reused.
    next_id: u64,
    records: HashMap<u64, RegistrationRecord>,
    /// reg_id -> ids of every record carrying it, oldest first
    by_reg_id: HashMap<String, Vec<u64>>,
}

impl Default for RecordTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: HashMap::new(),
            by_reg_id: HashMap::new(),
        }
    }
}

impl RecordTable {
    /// Rebuild a table from persisted records.
    pub fn from_records(next_id: u64, records: Vec<RegistrationRecord>) -> Self {
        let mut table = Self {
            next_id,
            ..Self::default()
        };
        for record in records {
            table.index(record);
        }
        table
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn records(&self) -> impl Iterator<Item = &RegistrationRecord> {
        self.records.values()
    }

    pub fn find(&self, reg_id: &str) -> Option<&RegistrationRecord> {
        self.by_reg_id
            .get(reg_id)
            .and_then(|ids| ids.first())
            .and_then(|id| self.records.get(id))
    }

    pub fn insert(&mut self, reg_id: &str) -> StoreResult<RegistrationRecord> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupt("record id space exhausted".into()))?;

        let record = RegistrationRecord::new(id, reg_id);
        self.index(record.clone());
        Ok(record)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let Some(record) = self.records.remove(&id) else {
            return false;
        };
        if let Some(ids) = self.by_reg_id.get_mut(&record.reg_id) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.by_reg_id.remove(&record.reg_id);
            }
        }
        true
    }

    pub fn remove_all(&mut self, reg_id: &str) -> usize {
        let ids = self.by_reg_id.remove(reg_id).unwrap_or_default();
        for id in &ids {
            self.records.remove(id);
        }
        ids.len()
    }

    pub fn take(&self, limit: usize) -> Vec<RegistrationRecord> {
        self.records.values().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    fn index(&mut self, record: RegistrationRecord) {
        self.by_reg_id
            .entry(record.reg_id.clone())
            .or_default()
            .push(record.id);
        self.records.insert(record.id, record);
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<RecordTable>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_reg_id(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>> {
        Ok(self.table.read().await.find(reg_id).cloned())
    }

    async fn save(&self, reg_id: &str) -> StoreResult<RegistrationRecord> {
        let record = self.table.write().await.insert(reg_id)?;
        debug!(id = record.id, "Memory store: saved record");
        Ok(record)
    }

    async fn delete(&self, record: &RegistrationRecord) -> StoreResult<()> {
        self.table.write().await.remove(record.id);
        Ok(())
    }

    async fn list(&self, limit: usize) -> StoreResult<Vec<RegistrationRecord>> {
        Ok(self.table.read().await.take(limit))
    }

    async fn insert_if_absent(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>> {
        let mut table = self.table.write().await;
        if table.find(reg_id).is_some() {
            return Ok(None);
        }
        table.insert(reg_id).map(Some)
    }

    async fn delete_if_present(&self, reg_id: &str) -> StoreResult<bool> {
        Ok(self.table.write().await.remove_all(reg_id) > 0)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.table.read().await.len())
    }
}
