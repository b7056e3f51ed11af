//! Kamereon response bodies.
//!
//! Successful responses wrap the channel data in `data.attributes`; failed
//! ones carry an `errors` array with a machine-readable `errorCode`.
//!
//! ```json
//! {"data": {"type": "Car", "id": "VF1AAAAA555777999",
//!           "attributes": {"batteryLevel": 60, "plugStatus": 1}}}
//!
//! {"errors": [{"errorCode": "err.func.403",
//!              "errorMessage": "Access is denied for this resource"}]}
//! ```

use std::collections::BTreeMap;

use carwatch_poller::FetchError;
use carwatch_types::{Channel, FieldValue, Snapshot};
use serde::Deserialize;
use serde_json::Value;

use crate::AdapterError;

/// Error code for a resource the account may not read.
pub const ACCESS_DENIED: &str = "err.func.403";
/// Error code for an exhausted call quota.
pub const QUOTA_LIMIT: &str = "err.func.wired.overloaded";
/// Error code for an endpoint the vehicle does not support.
pub const NOT_SUPPORTED: &str = "err.tech.501";

#[derive(Debug, Deserialize)]
struct Response {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    error_code: String,
    #[serde(default)]
    error_message: String,
}

/// Map an API error code to the fetch error taxonomy.
pub fn classify(code: &str, message: &str) -> FetchError {
    let detail = format!("{code}: {message}");
    match code {
        ACCESS_DENIED => FetchError::AccessDenied(detail),
        QUOTA_LIMIT => FetchError::QuotaExceeded(detail),
        NOT_SUPPORTED => FetchError::NotSupported(detail),
        _ => FetchError::Remote(detail),
    }
}

/// Parse a response body into a snapshot for `channel`.
///
/// An error body takes precedence over any data. Null, array and object
/// attributes are dropped; snapshots only carry scalar fields.
pub fn parse(channel: Channel, body: &str) -> Result<Snapshot, AdapterError> {
    let response: Response =
        serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

    if let Some(error) = response.errors.into_iter().next() {
        return Err(AdapterError::Api {
            code: error.error_code,
            message: error.error_message,
        });
    }

    let data = response
        .data
        .ok_or_else(|| AdapterError::Parse("response has neither data nor errors".to_string()))?;

    let snapshot = data
        .attributes
        .into_iter()
        .fold(Snapshot::builder(channel), |builder, (key, value)| {
            builder.maybe_field(key, scalar(value))
        })
        .build();
    Ok(snapshot)
}

fn scalar(value: Value) -> Option<FieldValue> {
    match value {
        Value::Bool(b) => Some(FieldValue::Bool(b)),
        Value::Number(n) => n.as_f64().map(FieldValue::Number),
        Value::String(s) => Some(FieldValue::Text(s)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
