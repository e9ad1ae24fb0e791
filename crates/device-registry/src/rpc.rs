//! Operation dispatch table.
//!
//! Every callable operation is listed in [`Operation`]; the transport resolves
//! the operation name once and hands the raw parameters to [`dispatch`].

use crate::directory::Directory;
use crate::error::RegistryError;
use registration_store::RegistrationRecord;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Operations exposed by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Unregister,
    ListDevices,
}

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::Register,
        Operation::Unregister,
        Operation::ListDevices,
    ];

    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Unregister => "unregister",
            Operation::ListDevices => "listDevices",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| RegistryError::UnknownOperation(s.to_string()))
    }
}

/// Parameters for register and unregister.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegIdParams {
    reg_id: String,
}

/// Parameters for listDevices. Negative counts are rejected.
#[derive(Debug, Deserialize)]
struct ListParams {
    count: usize,
}

/// Result of a dispatched operation.
#[derive(Debug, PartialEq)]
pub enum RpcOutcome {
    /// The operation has no result body.
    Empty,
    /// A bounded collection of records.
    Items(Vec<RegistrationRecord>),
}

/// Run `operation` against the directory with JSON parameters.
pub async fn dispatch(
    directory: &Directory,
    operation: Operation,
    params: Value,
) -> Result<RpcOutcome, RegistryError> {
    debug!(%operation, "Dispatching operation");

    match operation {
        Operation::Register => {
            let params: RegIdParams = serde_json::from_value(params)?;
            directory.register(&params.reg_id).await?;
            Ok(RpcOutcome::Empty)
        }
        Operation::Unregister => {
            let params: RegIdParams = serde_json::from_value(params)?;
            directory.unregister(&params.reg_id).await?;
            Ok(RpcOutcome::Empty)
        }
        Operation::ListDevices => {
            let params: ListParams = serde_json::from_value(params)?;
            Ok(RpcOutcome::Items(directory.list(params.count).await?))
        }
    }
}
