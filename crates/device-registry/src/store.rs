//! Record store selection.

use crate::config::{StoreBackend, StoreConfig};
use registration_store::{FileStore, MemoryStore, RecordStore, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

/// Open the configured record store backend.
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory storage (registrations will be lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File => {
            if config.encryption_key.is_none() {
                info!("No encryption key configured, store file will be plaintext");
            }
            let store = FileStore::open(&config.path, config.encryption_key.as_ref()).await?;
            Ok(Arc::new(store))
        }
    }
}
