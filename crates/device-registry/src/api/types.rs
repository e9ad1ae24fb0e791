//! API request and response types.

use registration_store::RegistrationRecord;
use serde::Serialize;

/// A registration as exposed to callers: the store id and the push token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceItem {
    pub id: u64,
    pub reg_id: String,
}

impl From<RegistrationRecord> for DeviceItem {
    fn from(record: RegistrationRecord) -> Self {
        Self {
            id: record.id,
            reg_id: record.reg_id,
        }
    }
}

/// Collection result of a listing operation.
#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub items: Vec<DeviceItem>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub record_count: usize,
    pub operations: Vec<&'static str>,
}
