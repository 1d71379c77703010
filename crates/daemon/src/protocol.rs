// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 protocol for daemon communication.
//!
//! Wire format: one connection carries exactly one request and one response,
//! each a complete top-level JSON object. There is no length prefix; the
//! reader grows its buffer until `serde_json` can parse a full value out of
//! it. See [`read_request`] / [`write_response`].

use oj_core::{CommandType, ContainerStatus, LogLevel};
use oj_engine::{EngineError, ExecuteError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum request size accepted before a connection is dropped.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default RPC handler timeout, per `OPD_REQUEST_TIMEOUT_SECS`.
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
    #[error("connection closed before a complete request arrived")]
    ConnectionClosed,
    #[error("handler timed out")]
    Timeout,
}

/// `{jsonrpc, id, method, params}`. `id` is echoed back verbatim, including
/// `null`, so the caller can match responses without relying on transport
/// ordering (even though this transport only ever carries one at a time).
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

pub const CODE_PARSE_ERROR: i32 = -32700;
pub const CODE_METHOD_NOT_FOUND: i32 = -32601;
pub const CODE_HANDLER_ERROR: i32 = -32000;
pub const CODE_TIMEOUT: i32 = -32001;

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: serde_json::Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Map a handler failure to its JSON-RPC error code. The message text is
/// always the error's `Display` output verbatim; clients match on it.
pub fn engine_error_to_rpc(id: serde_json::Value, err: &EngineError) -> RpcResponse {
    RpcResponse::err(id, CODE_HANDLER_ERROR, err.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContainerParams {
    pub container_id: Option<String>,
    pub player_id: i64,
    #[serde(default = "default_container_type")]
    pub container_type: String,
    pub config: CreateContainerConfig,
}

fn default_container_type() -> String {
    "command".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContainerConfig {
    pub command_type: CommandType,
    #[serde(default)]
    pub params: serde_json::Value,
    pub ship_symbol: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: i64,
}

fn default_max_iterations() -> i64 {
    -1
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateContainerResult {
    pub container_id: String,
    pub status: ContainerStatus,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListContainersParams {
    pub player_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    pub container_id: String,
    pub player_id: i64,
    pub command_type: CommandType,
    pub status: ContainerStatus,
    pub current_iteration: u32,
    pub restart_count: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InspectContainerParams {
    pub container_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerDetail {
    #[serde(flatten)]
    pub summary: ContainerSummary,
    pub config: serde_json::Value,
    pub exit_code: Option<i32>,
    pub exit_reason: Option<String>,
    pub max_iterations: i64,
    pub logs: Vec<LogEntry>,
}

/// Tail length for the log slice embedded in `inspect_container`.
pub(crate) const INSPECT_LOG_TAIL: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct GetLogsParams {
    pub container_id: String,
    pub player_id: i64,
    #[serde(default)]
    pub level: Option<LogLevel>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub seq: u64,
    pub ts: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopContainerParams {
    pub container_id: String,
}

/// Not part of the headline method table, but `container.create`'s sibling:
/// restart moves the ship lock to a freshly-identified container (§4.4), so
/// callers need a way to trigger it without going through `health_check`'s
/// automatic recovery path.
#[derive(Debug, Clone, Deserialize)]
pub struct RestartContainerParams {
    pub container_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveContainerParams {
    pub container_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OkResult {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub status: &'static str,
    pub version: &'static str,
    pub active_containers: usize,
}

/// Read one JSON-RPC request from `reader`: grow a buffer one read at a time
/// until a complete top-level JSON value parses out of it. There is no
/// length prefix and no half-close; the caller is expected to have written
/// its whole request and stop writing once it has.
pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<RpcRequest, ProtocolError> {
    tokio::time::timeout(timeout, read_request_inner(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

async fn read_request_inner<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<RpcRequest, ProtocolError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if buf.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: buf.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        match serde_json::from_slice::<RpcRequest>(&buf) {
            Ok(req) => return Ok(req),
            Err(e) if e.is_eof() => {}
            Err(e) if buf.is_empty() => return Err(ProtocolError::Json(e)),
            Err(_) => {
                // Buffer holds a value but not (yet) a valid RpcRequest shape;
                // keep reading in case it's still incomplete, otherwise this
                // surfaces as a parse error once the stream closes below.
            }
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Err(ProtocolError::ConnectionClosed);
            }
            return Ok(serde_json::from_slice(&buf)?);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Write a response and close. No half-close dance: the full encoded
/// response is written in one shot, then the caller drops the socket.
pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &RpcResponse,
) -> Result<(), ProtocolError> {
    let data = serde_json::to_vec(response)?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
