// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer authorization.
//!
//! A daemon running as an ordinary user only serves that user. A root daemon
//! serves everyone, and each peer's uid selects its own record.

use nix::unistd::geteuid;
use thiserror::Error;
use tokio::net::UnixStream;

use crate::adapters::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("uid={peer} may not use a daemon running as uid={daemon}")]
    UidMismatch { peer: u32, daemon: u32 },
}

/// Trust policy keyed on the daemon's effective uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    daemon_uid: u32,
}

impl Gate {
    pub fn new(daemon_uid: u32) -> Self {
        Self { daemon_uid }
    }

    /// Gate for the current process's effective uid.
    pub fn from_process() -> Self {
        Self::new(geteuid().as_raw())
    }

    pub fn is_privileged(&self) -> bool {
        self.daemon_uid == 0
    }

    pub fn authorize(&self, peer: Identity) -> Result<Identity, AuthError> {
        if self.is_privileged() || peer.uid == self.daemon_uid {
            Ok(peer)
        } else {
            Err(AuthError::UidMismatch { peer: peer.uid, daemon: self.daemon_uid })
        }
    }
}

/// Uid and gid of the process on the other end of `stream`.
pub fn peer_identity(stream: &UnixStream) -> std::io::Result<Identity> {
    let cred = stream.peer_cred()?;
    Ok(Identity { uid: cred.uid(), gid: cred.gid() })
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
