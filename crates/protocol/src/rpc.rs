use crate::error::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the line-delimited JSON-RPC transport (spec.md §6).
///
/// `id` is echoed back on the matching `RpcResponse` so callers can
/// correlate concurrent in-flight requests; it is opaque to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Every tool returns a single text blob as its result (spec.md §6): the
/// protocol never surfaces exceptions, only `result` (success) xor `error`
/// (failure), each serialized to one line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    #[must_use]
    pub fn ok(id: Option<Value>, result: impl Into<String>) -> Self {
        Self {
            id,
            result: Some(result.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn err(id: Option<Value>, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(RpcError {
                category,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub category: ErrorCategory,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let line = r#"{"id":1,"method":"search_code","params":{"query":"foo"}}"#;
        let req: RpcRequest = serde_json::from_str(line).unwrap();
        assert_eq!(req.method, "search_code");
        assert_eq!(req.id, Some(Value::from(1)));
    }

    #[test]
    fn response_carries_either_result_or_error_not_both() {
        let ok = RpcResponse::ok(None, "done");
        assert!(ok.result.is_some());
        assert!(ok.error.is_none());

        let err = RpcResponse::err(None, ErrorCategory::NotIndexed, "no such tree");
        assert!(err.result.is_none());
        assert!(err.error.is_some());
    }
}
