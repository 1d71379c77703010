// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation daemon library
//!
//! This module exposes the JSON-RPC protocol types for use by clients of
//! the daemon (tests, future CLI tooling).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;

pub use protocol::{
    ContainerDetail, ContainerSummary, CreateContainerConfig, CreateContainerParams,
    CreateContainerResult, GetLogsParams, HealthCheckResult, InspectContainerParams, LogEntry,
    ListContainersParams, OkResult, ProtocolError, RemoveContainerParams, RestartContainerParams,
    RpcError, RpcRequest, RpcResponse, StopContainerParams, DEFAULT_REQUEST_TIMEOUT,
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
