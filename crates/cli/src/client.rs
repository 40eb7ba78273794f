// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session resolver: one request/response exchange with envoyd.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use envoy_wire::{AgentSession, KindRequest, ProtocolError, SessionStatus};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to envoyd at {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent failed to start, check envoyd's log")]
    AgentFailed,

    #[error("connection rejected, user is unauthorized to use this agent")]
    Unauthorized,

    #[error("envoyd returned a {0} session")]
    Unexpected(SessionStatus),

    #[error(transparent)]
    Protocol(ProtocolError),
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        if is_rejection(&e) {
            Self::Unauthorized
        } else {
            Self::Protocol(e)
        }
    }
}

/// The daemon rejects a peer by closing without a reply. Depending on timing
/// the client sees that as EOF, a reset, or a broken pipe on its request.
fn is_rejection(e: &ProtocolError) -> bool {
    match e {
        ProtocolError::ConnectionClosed => true,
        ProtocolError::Io(io) => {
            matches!(io.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset)
        }
        _ => false,
    }
}

/// Ask the daemon at `socket` for a session.
pub async fn resolve(
    socket: &Path,
    request: KindRequest,
    timeout: Duration,
) -> Result<AgentSession, ClientError> {
    let mut stream = UnixStream::connect(socket)
        .await
        .map_err(|source| ClientError::Connect { path: socket.to_path_buf(), source })?;
    exchange(&mut stream, request, timeout).await
}

/// Ask the daemon at the configured socket for a session.
pub async fn resolve_default(request: KindRequest) -> Result<AgentSession, ClientError> {
    resolve(&envoy_daemon::env::socket_path(), request, envoy_daemon::env::ipc_timeout()).await
}

/// Send `request` over an open connection and read back a usable session.
pub async fn exchange<S>(
    stream: &mut S,
    request: KindRequest,
    timeout: Duration,
) -> Result<AgentSession, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    envoy_wire::write_request(stream, request, timeout).await?;
    let session = envoy_wire::read_session(stream, timeout).await?;
    check(session)
}

/// Turn error statuses into errors.
pub fn check(session: AgentSession) -> Result<AgentSession, ClientError> {
    match session.status {
        SessionStatus::Started | SessionStatus::Running => Ok(session),
        SessionStatus::Failed => Err(ClientError::AgentFailed),
        SessionStatus::UnauthorizedUser => Err(ClientError::Unauthorized),
        SessionStatus::Stopped => Err(ClientError::Unexpected(SessionStatus::Stopped)),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
