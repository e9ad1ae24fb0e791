//! The record store interface.

use crate::error::StoreError;
use crate::types::RegistrationRecord;
use async_trait::async_trait;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed storage for registration records.
///
/// `save` and `delete` are unconditional. A lookup followed by one of them is two
/// separate store calls, so concurrent callers can interleave between them.
/// `insert_if_absent` and `delete_if_present` perform the lookup and the write as
/// one atomic step.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a record by its push token.
    ///
    /// If several records carry the same token, any one of them is returned.
    async fn find_by_reg_id(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>>;

    /// Insert a new record for `reg_id` without checking for an existing one.
    async fn save(&self, reg_id: &str) -> StoreResult<RegistrationRecord>;

    /// Delete a record by id. Deleting a record that is already gone is not an error.
    async fn delete(&self, record: &RegistrationRecord) -> StoreResult<()>;

    /// Return up to `limit` records in no particular order.
    async fn list(&self, limit: usize) -> StoreResult<Vec<RegistrationRecord>>;

    /// Insert a record unless one with `reg_id` already exists.
    ///
    /// Returns the new record, or `None` if the token was already present.
    async fn insert_if_absent(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>>;

    /// Delete every record carrying `reg_id`. Returns whether anything was removed.
    async fn delete_if_present(&self, reg_id: &str) -> StoreResult<bool>;

    /// Number of stored records.
    async fn count(&self) -> StoreResult<usize>;
}
