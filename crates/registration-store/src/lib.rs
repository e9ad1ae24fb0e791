//! Record store for push-notification device registrations.
//!
//! The store is a plain keyed collection of [`RegistrationRecord`]s. It does not
//! enforce uniqueness of `reg_id` on [`RecordStore::save`]; callers that need
//! "at most one record per token" either use the conditional operations
//! ([`RecordStore::insert_if_absent`], [`RecordStore::delete_if_present`]) or
//! accept the lookup/write race that comes with a separate lookup.

mod error;
mod file;
mod memory;
mod store;
mod types;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{RecordStore, StoreResult};
pub use types::RegistrationRecord;
