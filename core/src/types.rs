//! Wire DTOs for the Onfleet API.
//!
//! # Design
//! Request and response bodies travel as `serde_json::Value` through the
//! dispatcher, since argument interpretation is shape based. The types here
//! cover the payloads the core itself has to understand (the error
//! envelope) plus a typed `Task` that callers can decode a response into.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure body returned by the API on non-2xx responses:
/// `{ "code": "...", "message": { "error": 2300, "message": "...", ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub message: ErrorBody,
}

/// The structured part of an error payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: i64,
    pub message: String,
    #[serde(default)]
    pub cause: Option<Value>,
    #[serde(default)]
    pub request: Option<String>,
}

/// A task as returned by the tasks resource. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub short_id: String,
    #[serde(rename = "trackingURL")]
    pub tracking_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub state: u8,
}
