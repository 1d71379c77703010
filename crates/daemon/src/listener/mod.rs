// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O (C1).
//!
//! The Listener runs in a spawned task, accepting connections and serving
//! each on its own short-lived task so one slow client never blocks
//! another. Each connection carries exactly one JSON-RPC request and one
//! response; see [`crate::protocol`].

use std::sync::Arc;

use oj_core::SystemClock;
use oj_engine::{ContainerManager, HealthMonitor, ShipAssignmentManager};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

use crate::protocol::{
    self, engine_error_to_rpc, ContainerDetail, ContainerSummary, CreateContainerParams,
    CreateContainerResult, GetLogsParams, HealthCheckResult, InspectContainerParams,
    ListContainersParams, LogEntry, OkResult, RemoveContainerParams, RestartContainerParams,
    RpcRequest, RpcResponse, StopContainerParams, CODE_METHOD_NOT_FOUND, CODE_PARSE_ERROR,
    PROTOCOL_VERSION,
};

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx {
    pub containers: Arc<ContainerManager<SystemClock>>,
    pub assignments: Arc<ShipAssignmentManager>,
    pub health: Arc<HealthMonitor<SystemClock>>,
    pub request_timeout: std::time::Duration,
}

/// Listener task for accepting socket connections.
pub(crate) struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    /// Run the accept loop until the process exits, spawning one task per
    /// connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        handle_connection(stream, &ctx).await;
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection end to end: read one request, dispatch
/// it, write one response, close.
async fn handle_connection(stream: UnixStream, ctx: &ListenCtx) {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, ctx.request_timeout).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("client disconnected before sending a request");
            return;
        }
        Err(protocol::ProtocolError::Timeout) => {
            warn!("timed out waiting for a request");
            return;
        }
        Err(e) => {
            warn!("malformed request: {}", e);
            let response = RpcResponse::err(serde_json::Value::Null, CODE_PARSE_ERROR, e.to_string());
            let _ = protocol::write_response(&mut writer, &response).await;
            return;
        }
    };

    if request.method == "health_check" || request.method == "list_containers" {
        debug!(method = %request.method, "received request");
    } else {
        tracing::info!(method = %request.method, id = ?request.id, "received request");
    }

    let id = request.id.clone();
    let response = match tokio::time::timeout(ctx.request_timeout, dispatch(request, ctx)).await {
        Ok(response) => response,
        Err(_) => RpcResponse::err(id, protocol::CODE_TIMEOUT, "handler timed out"),
    };

    debug!(?response, "sending response");
    if let Err(e) = protocol::write_response(&mut writer, &response).await {
        warn!("failed to write response: {}", e);
    }
}

/// Dispatch one decoded request to its handler and build the response.
async fn dispatch(request: RpcRequest, ctx: &ListenCtx) -> RpcResponse {
    let RpcRequest { id, method, params, .. } = request;

    macro_rules! parse_params {
        ($ty:ty) => {
            match serde_json::from_value::<$ty>(params) {
                Ok(p) => p,
                Err(e) => return RpcResponse::err(id, CODE_PARSE_ERROR, format!("invalid params: {e}")),
            }
        };
    }

    match method.as_str() {
        "list_containers" => {
            let params: ListContainersParams = parse_params!(ListContainersParams);
            handle_list_containers(id, params, ctx)
        }
        "inspect_container" => {
            let params = parse_params!(InspectContainerParams);
            handle_inspect_container(id, params, ctx)
        }
        "get_logs" => {
            let params = parse_params!(GetLogsParams);
            handle_get_logs(id, params, ctx)
        }
        "stop_container" => {
            let params = parse_params!(StopContainerParams);
            handle_stop_container(id, params, ctx)
        }
        "remove_container" => {
            let params = parse_params!(RemoveContainerParams);
            handle_remove_container(id, params, ctx)
        }
        "container.create" => {
            let params = parse_params!(CreateContainerParams);
            handle_create_container(id, params, ctx)
        }
        "restart_container" => {
            let params = parse_params!(RestartContainerParams);
            handle_restart_container(id, params, ctx)
        }
        "health_check" => handle_health_check(id, ctx),
        _ => RpcResponse::err(id, CODE_METHOD_NOT_FOUND, format!("unknown method: {method}")),
    }
}

fn to_summary(c: &oj_core::Container) -> ContainerSummary {
    ContainerSummary {
        container_id: c.id.as_str().to_string(),
        player_id: c.player_id,
        command_type: c.command_type,
        status: c.status,
        current_iteration: c.current_iteration,
        restart_count: c.restart_count,
        created_at: c.created_at,
    }
}

fn handle_list_containers(
    id: serde_json::Value,
    params: ListContainersParams,
    ctx: &ListenCtx,
) -> RpcResponse {
    let summaries: Vec<ContainerSummary> = ctx
        .containers
        .list()
        .iter()
        .filter(|c| params.player_id.is_none_or(|p| p == c.player_id))
        .map(to_summary)
        .collect();
    RpcResponse::ok(id, serde_json::to_value(summaries).unwrap_or_default())
}

fn handle_inspect_container(
    id: serde_json::Value,
    params: InspectContainerParams,
    ctx: &ListenCtx,
) -> RpcResponse {
    let Some(container) = ctx.containers.inspect(&params.container_id) else {
        return RpcResponse::err(
            id,
            protocol::CODE_HANDLER_ERROR,
            oj_core::ContainerError::NotFound.to_string(),
        );
    };

    let mut logs: Vec<LogEntry> = ctx
        .containers
        .logs(container.id.as_str())
        .iter()
        .map(|l| LogEntry {
            seq: l.seq,
            ts: l.ts,
            level: l.level,
            message: l.message.clone(),
        })
        .collect();
    let tail_start = logs.len().saturating_sub(protocol::INSPECT_LOG_TAIL);
    logs.drain(..tail_start);

    let detail = ContainerDetail {
        summary: to_summary(&container),
        config: container.config.clone(),
        exit_code: container.exit_code,
        exit_reason: container.exit_reason.clone(),
        max_iterations: container.max_iterations,
        logs,
    };
    RpcResponse::ok(id, serde_json::to_value(detail).unwrap_or_default())
}

fn handle_get_logs(id: serde_json::Value, params: GetLogsParams, ctx: &ListenCtx) -> RpcResponse {
    let Some(container) = ctx.containers.inspect(&params.container_id) else {
        return RpcResponse::err(
            id,
            protocol::CODE_HANDLER_ERROR,
            oj_core::ContainerError::NotFound.to_string(),
        );
    };
    if container.player_id != params.player_id {
        return RpcResponse::err(
            id,
            protocol::CODE_HANDLER_ERROR,
            oj_core::ContainerError::NotFound.to_string(),
        );
    }

    let mut logs: Vec<LogEntry> = ctx
        .containers
        .logs(container.id.as_str())
        .iter()
        .filter(|l| params.level.is_none_or(|lvl| l.level == lvl))
        .map(|l| LogEntry {
            seq: l.seq,
            ts: l.ts,
            level: l.level,
            message: l.message.clone(),
        })
        .collect();
    if let Some(limit) = params.limit {
        let start = logs.len().saturating_sub(limit);
        logs.drain(..start);
    }
    RpcResponse::ok(id, serde_json::to_value(logs).unwrap_or_default())
}

fn handle_stop_container(
    id: serde_json::Value,
    params: StopContainerParams,
    ctx: &ListenCtx,
) -> RpcResponse {
    match ctx.containers.stop(&params.container_id) {
        Ok(()) => RpcResponse::ok(id, serde_json::to_value(OkResult { ok: true }).unwrap()),
        Err(e) => engine_error_to_rpc(id, &e),
    }
}

fn handle_remove_container(
    id: serde_json::Value,
    params: RemoveContainerParams,
    ctx: &ListenCtx,
) -> RpcResponse {
    match ctx.containers.remove(&params.container_id) {
        Ok(()) => RpcResponse::ok(id, serde_json::to_value(OkResult { ok: true }).unwrap()),
        Err(e) => engine_error_to_rpc(id, &e),
    }
}

fn handle_create_container(
    id: serde_json::Value,
    params: CreateContainerParams,
    ctx: &ListenCtx,
) -> RpcResponse {
    let container_id = params.container_id.map(oj_core::ContainerId::new);
    let config = params.config;
    match ctx.containers.create(
        container_id,
        params.player_id,
        config.command_type,
        &config.ship_symbol,
        config.params,
        config.max_iterations,
    ) {
        Ok(new_id) => {
            let status = ctx
                .containers
                .inspect(new_id.as_str())
                .map(|c| c.status)
                .unwrap_or(oj_core::ContainerStatus::Pending);
            let result = CreateContainerResult {
                container_id: new_id.as_str().to_string(),
                status,
            };
            RpcResponse::ok(id, serde_json::to_value(result).unwrap())
        }
        Err(e) => engine_error_to_rpc(id, &e),
    }
}

fn handle_restart_container(
    id: serde_json::Value,
    params: RestartContainerParams,
    ctx: &ListenCtx,
) -> RpcResponse {
    match ctx.containers.restart(&params.container_id) {
        Ok(new_id) => {
            ctx.health.reset_watch(&params.container_id);
            let status = ctx
                .containers
                .inspect(new_id.as_str())
                .map(|c| c.status)
                .unwrap_or(oj_core::ContainerStatus::Pending);
            let result = CreateContainerResult {
                container_id: new_id.as_str().to_string(),
                status,
            };
            RpcResponse::ok(id, serde_json::to_value(result).unwrap())
        }
        Err(e) => engine_error_to_rpc(id, &e),
    }
}

fn handle_health_check(id: serde_json::Value, ctx: &ListenCtx) -> RpcResponse {
    let active_containers = ctx
        .containers
        .list()
        .iter()
        .filter(|c| !c.status.is_terminal())
        .count();
    let result = HealthCheckResult {
        status: "ok",
        version: PROTOCOL_VERSION,
        active_containers,
    };
    RpcResponse::ok(id, serde_json::to_value(result).unwrap())
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
