use std::fmt;

use kameo::Reply;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ComputationError;

/// Caller-chosen request identifier, echoed back verbatim.
///
/// Any JSON value is accepted; the worker never inspects or generates ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Value);

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(Value::String(id.to_string()))
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(Value::String(id))
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(Value::from(id))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// `{ id, type, data, options }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationRequest {
    pub id: RequestId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub options: Value,
}

impl ComputationRequest {
    pub fn new(id: impl Into<RequestId>, kind: impl Into<String>, data: Value, options: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
            options,
        }
    }
}

/// `{ id, success: true, result }` or `{ id, success: false, error }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reply)]
pub struct ComputationResponse {
    pub id: RequestId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComputationResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: RequestId, error: &ComputationError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

/// Fire-and-forget messages for ComputationActor; replies go to the response stream
#[derive(Debug, Clone)]
pub enum DispatcherTell {
    Post(ComputationRequest),
}

/// Snapshot of worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Reply)]
pub struct DispatcherStats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Ask for [`DispatcherStats`]
#[derive(Debug, Clone, Copy)]
pub struct GetStats;
