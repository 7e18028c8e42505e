//! Line-oriented JSON wire format.
//!
//! Each request is one JSON object on its own line:
//!
//! ```json
//! {"id": "1", "type": "search", "query": "Barack Obama", "limit": 12, "timeout": 5}
//! ```
//!
//! `id` is echoed back verbatim and may be any JSON value. `timeout`, in
//! seconds, bounds the whole request; for `shortestPath` it is also the
//! search deadline. Each request gets exactly one response line:
//!
//! ```json
//! {"id": "1", "status": "success", "response": ["Barack Obama", "Michelle Obama"]}
//! ```
//!
//! Failures carry `"status": "failed"` and a message string as `response`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{HuginnError, Result};

/// Message sent for requests that outlive their timeout.
pub const TIMEOUT_MESSAGE: &str = "Operation timed out.";

/// A decoded request line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    /// Seconds; negative values are rejected at dispatch.
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(flatten)]
    pub operation: Operation,
}

/// The operations a client may ask for.
///
/// Numeric arguments are signed so that negative values reach validation
/// and fail with a clear message instead of a parse error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Operation {
    Search {
        query: String,
        limit: i64,
    },
    GetPage {
        page_title: String,
    },
    Zeitgeist {
        limit: i64,
    },
    Trending {
        time_limit_in_seconds: i64,
        max_items: i64,
    },
    WindowedPeakLoad {
        #[serde(default)]
        time_window_in_seconds: Option<i64>,
    },
    ShortestPath {
        page_title1: String,
        page_title2: String,
    },
    Stop,
}

impl Operation {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Search { .. } => "search",
            Operation::GetPage { .. } => "getPage",
            Operation::Zeitgeist { .. } => "zeitgeist",
            Operation::Trending { .. } => "trending",
            Operation::WindowedPeakLoad { .. } => "windowedPeakLoad",
            Operation::ShortestPath { .. } => "shortestPath",
            Operation::Stop => "stop",
        }
    }
}

/// Outcome marker on every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    pub status: Status,
    pub response: Value,
}

impl Response {
    pub fn success(id: Value, response: impl Into<Value>) -> Self {
        Self {
            id,
            status: Status::Success,
            response: response.into(),
        }
    }

    pub fn failed(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            status: Status::Failed,
            response: Value::String(message.into()),
        }
    }

    /// Failure response for `err`, with timeouts worded for clients.
    pub fn from_error(id: Value, err: &HuginnError) -> Self {
        match err {
            HuginnError::Timeout => Self::failed(id, TIMEOUT_MESSAGE),
            other => Self::failed(id, other.to_string()),
        }
    }
}

/// Decode one request line.
///
/// On failure, returns the `id` if the line was at least a JSON object so
/// the error response can still be matched to its request.
pub fn parse_request(line: &str) -> std::result::Result<Request, (Value, HuginnError)> {
    let raw: Value = serde_json::from_str(line).map_err(|e| (Value::Null, e.into()))?;
    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(raw).map_err(|e| (id, e.into()))
}

/// Convert a client-supplied number to an unsigned argument.
pub fn non_negative(name: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| HuginnError::InvalidArgument(format!("{name} must not be negative, got {value}")))
}
