// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener loop for the broker socket.
//!
//! Connections are served one at a time, to completion, on the daemon's only
//! task. Handling a request may wait on an agent launch; other clients queue
//! in the socket backlog meanwhile. The registry therefore needs no locking.

mod connection;

pub use connection::{handle_connection, Outcome};

use std::time::Duration;

use envoy_wire::{AgentKind, ProtocolError};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use crate::adapters::{AgentLauncher, SpawnError};
use crate::auth::{self, Gate};
use crate::lifecycle::{self, LifecycleError, SocketOrigin};
use crate::registry::Registry;

/// Shared daemon context for request handling.
pub struct ListenCtx<L> {
    pub gate: Gate,
    pub launcher: L,
    /// Kind started for `Preferred` requests
    pub preferred_kind: AgentKind,
    pub ipc_timeout: Duration,
}

/// Accepts connections and owns the registry.
pub struct Listener<L> {
    unix: UnixListener,
    origin: SocketOrigin,
    ctx: ListenCtx<L>,
    registry: Registry,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("failed to read peer credentials: {0}")]
    PeerCredentials(#[source] std::io::Error),

    #[error("Unix accept error: {0}")]
    Accept(#[source] std::io::Error),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

impl<L: AgentLauncher> Listener<L> {
    pub fn new(unix: UnixListener, origin: SocketOrigin, ctx: ListenCtx<L>) -> Self {
        Self { unix, origin, ctx, registry: Registry::new() }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Serve connections until SIGTERM or SIGINT, then tear down.
    ///
    /// A spawn failure ends the loop too: teardown still runs and the error is
    /// returned so the process exits nonzero.
    pub async fn run(mut self) -> Result<(), LifecycleError> {
        let mut sigterm = signal(SignalKind::terminate()).map_err(LifecycleError::Signal)?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(LifecycleError::Signal)?;

        let result = loop {
            tokio::select! {
                biased;
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                    break Ok(());
                }
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down");
                    break Ok(());
                }
                accepted = self.unix.accept() => match accepted {
                    Ok((stream, _)) => match self.serve(stream).await {
                        Ok(outcome) => debug!(?outcome, "connection finished"),
                        Err(ConnectionError::Spawn(e)) => {
                            error!(error = %e, "cannot start agents, shutting down");
                            break Err(LifecycleError::Spawn(e));
                        }
                        Err(e) => log_connection_error(e),
                    },
                    Err(e) => error!("Unix accept error: {}", e),
                },
            }
        };

        self.shutdown();
        result
    }

    /// Accept and fully serve the next connection.
    pub async fn serve_next(&mut self) -> Result<Outcome, ConnectionError> {
        let (stream, _) = self.unix.accept().await.map_err(ConnectionError::Accept)?;
        self.serve(stream).await
    }

    /// Release the socket and terminate tracked agents. Returns the number
    /// signalled.
    pub fn shutdown(&self) -> usize {
        lifecycle::shutdown(&self.registry, &self.origin, &self.ctx.launcher)
    }

    async fn serve(&mut self, stream: UnixStream) -> Result<Outcome, ConnectionError> {
        let peer = auth::peer_identity(&stream).map_err(ConnectionError::PeerCredentials)?;
        let (reader, writer) = stream.into_split();
        handle_connection(reader, writer, peer, &self.ctx, &mut self.registry).await
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected")
        }
        ConnectionError::Protocol(ProtocolError::Timeout) => {
            warn!("Connection timeout")
        }
        _ => error!("Connection error: {}", e),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
