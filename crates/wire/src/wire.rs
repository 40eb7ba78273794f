// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size record codec and timed socket I/O.
//!
//! ```text
//! offset  size  field
//!      0     4  status code (u32)
//!      4     4  kind code (u32)
//!      8     4  process id (i32)
//!     12  4096  socket path, NUL padded
//!   4108  4096  auxiliary info, NUL padded
//!   8204     1  first observation (0 or 1)
//!   8205     3  reserved, zero
//! ```

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::bounded::{BoundedString, FIELD_CAPACITY};
use crate::kind::{AgentKind, KindRequest};
use crate::session::AgentSession;
use crate::status::SessionStatus;

const STATUS_AT: usize = 0;
const KIND_AT: usize = 4;
const PID_AT: usize = 8;
const SOCKET_AT: usize = 12;
const INFO_AT: usize = SOCKET_AT + FIELD_CAPACITY;
const FLAG_AT: usize = INFO_AT + FIELD_CAPACITY;

/// Size of an encoded session record.
pub const RECORD_LEN: usize = FLAG_AT + 4;

/// Size of an encoded kind request.
pub const REQUEST_LEN: usize = 4;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,

    #[error("Truncated message: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("Unknown status code {0}")]
    UnknownStatus(u32),

    #[error("Unknown agent kind code {0}")]
    UnknownKind(u32),

    #[error("Invalid {0} field")]
    InvalidField(&'static str),
}

pub fn encode_request(request: KindRequest) -> [u8; REQUEST_LEN] {
    request.code().to_le_bytes()
}

pub fn decode_request(bytes: [u8; REQUEST_LEN]) -> Result<KindRequest, ProtocolError> {
    match u32::from_le_bytes(bytes) {
        KindRequest::PREFERRED_CODE => Ok(KindRequest::Preferred),
        code => AgentKind::from_code(code)
            .map(KindRequest::Explicit)
            .ok_or(ProtocolError::UnknownKind(code)),
    }
}

pub fn encode_session(session: &AgentSession) -> Vec<u8> {
    let mut buf = vec![0u8; RECORD_LEN];
    buf[STATUS_AT..KIND_AT].copy_from_slice(&session.status.code().to_le_bytes());
    buf[KIND_AT..PID_AT].copy_from_slice(&session.kind.code().to_le_bytes());
    buf[PID_AT..SOCKET_AT].copy_from_slice(&session.process_id.to_le_bytes());
    session.socket_path.write_field(&mut buf[SOCKET_AT..INFO_AT]);
    session.auxiliary_info.write_field(&mut buf[INFO_AT..FLAG_AT]);
    buf[FLAG_AT] = u8::from(session.first_observation);
    buf
}

pub fn decode_session(buf: &[u8]) -> Result<AgentSession, ProtocolError> {
    if buf.len() != RECORD_LEN {
        return Err(ProtocolError::Truncated { expected: RECORD_LEN, got: buf.len() });
    }

    let status = read_u32(buf, STATUS_AT);
    let status = SessionStatus::from_code(status).ok_or(ProtocolError::UnknownStatus(status))?;
    let kind = read_u32(buf, KIND_AT);
    let kind = AgentKind::from_code(kind).ok_or(ProtocolError::UnknownKind(kind))?;
    let process_id = i32::from_le_bytes([buf[PID_AT], buf[PID_AT + 1], buf[PID_AT + 2], buf[PID_AT + 3]]);
    let socket_path = BoundedString::read_field(&buf[SOCKET_AT..INFO_AT])
        .ok_or(ProtocolError::InvalidField("socket path"))?;
    let auxiliary_info = BoundedString::read_field(&buf[INFO_AT..FLAG_AT])
        .ok_or(ProtocolError::InvalidField("auxiliary info"))?;
    let first_observation = match buf[FLAG_AT] {
        0 => false,
        1 => true,
        _ => return Err(ProtocolError::InvalidField("first observation")),
    };

    Ok(AgentSession { status, kind, process_id, socket_path, auxiliary_info, first_observation })
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Read the client's kind request with timeout.
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<KindRequest, ProtocolError> {
    let mut buf = [0u8; REQUEST_LEN];
    with_timeout(timeout, read_full(reader, &mut buf)).await?;
    decode_request(buf)
}

/// Send a kind request with timeout.
pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: KindRequest,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    with_timeout(timeout, write_all(writer, &encode_request(request))).await
}

/// Read one session record with timeout.
///
/// A peer that closes without sending anything yields `ConnectionClosed`,
/// which is how the daemon signals a rejected connection.
pub async fn read_session<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<AgentSession, ProtocolError> {
    let mut buf = vec![0u8; RECORD_LEN];
    with_timeout(timeout, read_full(reader, &mut buf)).await?;
    decode_session(&buf)
}

/// Write one session record with timeout.
pub async fn write_session<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: &AgentSession,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    with_timeout(timeout, write_all(writer, &encode_session(session))).await
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, ProtocolError>>,
) -> Result<T, ProtocolError> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| ProtocolError::Timeout)?
}

async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 if filled == 0 => return Err(ProtocolError::ConnectionClosed),
            0 => return Err(ProtocolError::Truncated { expected: buf.len(), got: filled }),
            n => filled += n,
        }
    }
    Ok(())
}

async fn write_all<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> Result<(), ProtocolError> {
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "property_tests.rs"]
mod property_tests;
