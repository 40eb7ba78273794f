// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent process adapters
//!
//! `AgentLauncher` is the seam between connection handling and the operating
//! system. It covers the three things the daemon does to agent processes:
//! launch one under a user's identity, probe a tracked pid, and terminate it
//! at shutdown.

mod process;

pub use process::{AgentProgram, ProcessSupervisor};

// Test support - only compiled for tests
#[cfg(test)]
mod fake;
#[cfg(test)]
pub use fake::FakeLauncher;

use async_trait::async_trait;
use envoy_wire::{AgentKind, AgentSession};
use thiserror::Error;

/// The user and group an agent runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

/// Result of probing a tracked process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Gone,
}

/// Failures to start an agent process.
///
/// These are operating-system resource or identity failures rather than the
/// agent itself failing, and the daemon treats every one of them as fatal.
/// An agent that starts and then exits nonzero is reported as a `Failed`
/// session instead.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("no passwd entry for uid={0}")]
    NoPasswdEntry(u32),

    #[error("failed to lookup passwd entry for uid={uid}: {source}")]
    PasswdLookup {
        uid: u32,
        #[source]
        source: nix::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to capture {0} output")]
    Pipe(String),

    #[error("failed to read {program} output: {source}")]
    Read {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to get {program} process status: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Launches and tracks agent processes.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// Start an agent of `kind` as `identity` and report what it announced.
    ///
    /// Returns a session with status `Started` or `Failed`.
    async fn launch(&self, kind: AgentKind, identity: Identity)
        -> Result<AgentSession, SpawnError>;

    /// Check whether `pid` still exists. Non-positive pids are never alive.
    fn probe(&self, pid: i32) -> Liveness;

    /// Ask `pid` to terminate.
    fn terminate(&self, pid: i32) -> Result<(), nix::Error>;
}
