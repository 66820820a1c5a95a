//! Line-delimited JSON-RPC over stdin/stdout (spec.md §6 "RPC surface").
//!
//! One request per line in, one response per line out; console logs go to
//! stderr so stdout stays reserved for protocol messages. Every tool call
//! resolves to a single `RpcResponse` carrying either `result` (success) or
//! a categorized `error` (spec.md §7: "the protocol never sees exceptions
//! ... every RPC returns a structured text result, with an error prefix on
//! failure" — the category is the structure, the message is the prefix).

use crate::app::AppState;
use crate::error::AppError;
use crate::tools;
use eidetic_protocol::{ErrorCategory, RpcRequest, RpcResponse};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Runs the request/response loop until stdin closes (an orderly EOF) or
/// the caller's shutdown future resolves (SIGINT/SIGTERM, exit code 0 per
/// spec.md §6 "Exit codes").
pub async fn serve(state: &AppState) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => handle(state, request).await,
            Err(err) => RpcResponse::err(None, ErrorCategory::InvalidRequest, format!("malformed request: {err}")),
        };

        let mut payload = eidetic_protocol::serialize_line(&response).unwrap_or_else(|_| "{}".to_string());
        payload.push('\n');
        stdout.write_all(payload.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn handle(state: &AppState, request: RpcRequest) -> RpcResponse {
    match dispatch(state, &request.method, request.params).await {
        Ok(text) => RpcResponse::ok(request.id, text),
        Err(err) => RpcResponse::err(request.id, err.category(), err.to_string()),
    }
}

async fn dispatch(state: &AppState, method: &str, params: Value) -> Result<String, AppError> {
    match method {
        "index_codebase" => tools::index_codebase(state, parse_params(params)?).await,
        "search_code" => tools::search_code(state, parse_params(params)?).await,
        "clear_index" => tools::clear_index(state, parse_params(params)?).await,
        "get_indexing_status" => tools::get_indexing_status(state, parse_params(params)?).await,
        "list_indexed" => Ok(tools::list_indexed(state).await),
        "read_file" => tools::read_file(parse_params(params)?).await,
        "browse_structure" => tools::browse_structure(state, parse_params(params)?).await,
        "list_symbols" => tools::list_symbols(state, parse_params(params)?).await,
        other => Err(AppError::InvalidRequest(format!("unknown method {other:?}"))),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, AppError> {
    let params = if params.is_null() { Value::Object(serde_json::Map::new()) } else { params };
    serde_json::from_value(params).map_err(|err| AppError::InvalidRequest(format!("invalid params: {err}")))
}
