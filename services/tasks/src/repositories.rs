//! Repositories for table operations

use common::error::{BackendError, BackendResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod group;
pub mod task;

pub use group::TaskGroupRepository;
pub use task::TaskRepository;

/// Decode rows returned by the service
fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> BackendResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}

/// Decode the single row an insert returns
fn decode_inserted<T: DeserializeOwned>(rows: Vec<Value>, table: &str) -> BackendResult<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::Decode(format!("insert into {} returned no rows", table)))?;
    Ok(serde_json::from_value(row)?)
}
