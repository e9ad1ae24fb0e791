//! The registration directory.
//!
//! Each push token is either registered (exactly one record carries it) or
//! unregistered (none does). `register` and `unregister` move a token between
//! those two states and are no-ops when it is already in the target state.

use registration_store::{RecordStore, RegistrationRecord, StoreError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// How the directory enforces one record per token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Conditional store writes (insert-if-absent, delete-if-present).
    /// Concurrent calls for the same token cannot create duplicates.
    #[default]
    Atomic,
    /// Lookup, then a separate save or delete.
    ///
    /// Two concurrent `register` calls for the same token can both see it as
    /// absent and both insert, leaving duplicate records. A concurrent
    /// `unregister` can interleave with a `register` the same way.
    CheckThenAct,
}

/// Registration directory backed by a record store.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn RecordStore>,
    mode: WriteMode,
}

impl Directory {
    /// Create a directory using atomic conditional writes.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_mode(store, WriteMode::Atomic)
    }

    /// Create a directory with an explicit write mode.
    pub fn with_mode(store: Arc<dyn RecordStore>, mode: WriteMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Register a push token. Already-registered tokens are left untouched.
    ///
    /// Tokens are stored as given; no validation is performed.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn register(&self, reg_id: &str) -> Result<(), StoreError> {
        match self.mode {
            WriteMode::Atomic => {
                if self.store.insert_if_absent(reg_id).await?.is_none() {
                    info!(reg_id = %reg_id, "Device already registered, skipping register");
                    return Ok(());
                }
            }
            WriteMode::CheckThenAct => {
                if self.find_by_reg_id(reg_id).await?.is_some() {
                    info!(reg_id = %reg_id, "Device already registered, skipping register");
                    return Ok(());
                }
                self.store.save(reg_id).await?;
            }
        }

        info!(reg_id = %reg_id, "Device registered");
        Ok(())
    }

    /// Unregister a push token. Unknown tokens are ignored.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn unregister(&self, reg_id: &str) -> Result<(), StoreError> {
        match self.mode {
            WriteMode::Atomic => {
                if !self.store.delete_if_present(reg_id).await? {
                    info!(reg_id = %reg_id, "Device not registered, skipping unregister");
                    return Ok(());
                }
            }
            WriteMode::CheckThenAct => {
                let Some(record) = self.find_by_reg_id(reg_id).await? else {
                    info!(reg_id = %reg_id, "Device not registered, skipping unregister");
                    return Ok(());
                };
                self.store.delete(&record).await?;
            }
        }

        info!(reg_id = %reg_id, "Device unregistered");
        Ok(())
    }

    /// Return up to `count` registrations in no particular order.
    #[instrument(skip(self))]
    pub async fn list(&self, count: usize) -> Result<Vec<RegistrationRecord>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut records = self.store.list(count).await?;
        records.truncate(count);

        debug!(returned = records.len(), "Listed registrations");
        Ok(records)
    }

    /// Number of stored registrations.
    pub async fn record_count(&self) -> Result<usize, StoreError> {
        self.store.count().await
    }

    async fn find_by_reg_id(&self, reg_id: &str) -> Result<Option<RegistrationRecord>, StoreError> {
        self.store.find_by_reg_id(reg_id).await
    }
}
