//! Device Registry - push-notification registration directory.
//!
//! Mobile clients register or unregister an opaque push token; a broadcast
//! component elsewhere reads the directory to fan out notifications.
//! - Register/unregister are idempotent (duplicates and misses are no-ops)
//! - Listing is bounded and unordered
//! - Persistence is delegated to a [`RecordStore`]

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod rpc;
pub mod store;

pub use config::Config;
pub use directory::{Directory, WriteMode};
pub use error::RegistryError;
pub use registration_store::{RecordStore, RegistrationRecord, StoreError};
pub use rpc::{dispatch, Operation, RpcOutcome};
