//! Stored record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A device registration held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    /// Store-assigned identifier. Opaque to clients.
    pub id: u64,

    /// Push-notification token presented by the device
    pub reg_id: String,

    /// When the store persisted the record
    pub registered_at: DateTime<Utc>,
}

impl RegistrationRecord {
    /// Create a record with a freshly assigned id.
    pub fn new(id: u64, reg_id: impl Into<String>) -> Self {
        Self {
            id,
            reg_id: reg_id.into(),
            registered_at: Utc::now(),
        }
    }
}
