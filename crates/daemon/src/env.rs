// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon and its clients.

use std::path::PathBuf;
use std::time::Duration;

use envoy_wire::AgentKind;

/// Well-known socket path when `ENVOY_SOCKET` is unset
pub const DEFAULT_SOCKET_PATH: &str = "/run/envoy/envoy.sock";

/// Socket path: ENVOY_SOCKET > /run/envoy/envoy.sock
pub fn socket_path() -> PathBuf {
    std::env::var_os("ENVOY_SOCKET")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    std::env::var("ENVOY_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Agent binary for `kind`, overridable with `ENVOY_SSH_AGENT` / `ENVOY_GPG_AGENT`.
pub fn agent_binary(kind: AgentKind) -> PathBuf {
    let (var, default) = match kind {
        AgentKind::SshAgent => ("ENVOY_SSH_AGENT", "/usr/bin/ssh-agent"),
        AgentKind::GpgAgent => ("ENVOY_GPG_AGENT", "/usr/bin/gpg-agent"),
    };
    std::env::var_os(var)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Log filter directive (default `info`)
pub fn log_filter() -> String {
    std::env::var("ENVOY_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
