// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: socket acquisition, serving, shutdown.

mod shutdown;
mod startup;

pub use shutdown::shutdown;
pub use startup::{acquire_listener, acquire_lock, bind_socket, lock_path, InstanceLock};

use std::path::PathBuf;
use std::time::Duration;

use envoy_wire::AgentKind;
use thiserror::Error;
use tracing::info;

use crate::adapters::{AgentProgram, ProcessSupervisor, SpawnError};
use crate::auth::Gate;
use crate::listener::{ListenCtx, Listener};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix socket when not socket-activated
    pub socket_path: PathBuf,
    /// Kind started for clients that leave the choice to the daemon
    pub preferred_kind: AgentKind,
    /// Timeout for client I/O and agent announcements
    pub ipc_timeout: Duration,
    /// ssh-agent binary
    pub ssh_agent: PathBuf,
    /// gpg-agent binary
    pub gpg_agent: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load(preferred_kind: AgentKind) -> Self {
        Self {
            socket_path: crate::env::socket_path(),
            preferred_kind,
            ipc_timeout: crate::env::ipc_timeout(),
            ssh_agent: crate::env::agent_binary(AgentKind::SshAgent),
            gpg_agent: crate::env::agent_binary(AgentKind::GpgAgent),
        }
    }

    pub fn supervisor(&self) -> ProcessSupervisor {
        ProcessSupervisor::new(
            AgentProgram::for_kind(AgentKind::SshAgent, &self.ssh_agent),
            AgentProgram::for_kind(AgentKind::GpgAgent, &self.gpg_agent),
            self.ipc_timeout,
        )
    }
}

/// Where the listening socket came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOrigin {
    /// Bound by this daemon at the given path
    Created(PathBuf),
    /// Inherited from a socket activator. Agents outlive this daemon.
    Activated,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("too many file descriptors received: {0}")]
    TooManyDescriptors(usize),

    #[error("inherited file descriptor is not a unix socket")]
    NotUnixListener,

    #[error("failed to take inherited socket: {0}")]
    Activation(#[source] std::io::Error),

    #[error("another daemon is already listening on {0}")]
    AlreadyRunning(PathBuf),

    #[error("Failed to acquire lock: {0}")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Acquire the socket and serve until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<(), LifecycleError> {
    let (unix, origin, _lock) = acquire_listener(&config)?;
    match &origin {
        SocketOrigin::Created(path) => info!(socket = %path.display(), "listening"),
        SocketOrigin::Activated => info!("listening on inherited socket"),
    }

    let ctx = ListenCtx {
        gate: Gate::from_process(),
        launcher: config.supervisor(),
        preferred_kind: config.preferred_kind,
        ipc_timeout: config.ipc_timeout,
    };
    Listener::new(unix, origin, ctx).run().await
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
