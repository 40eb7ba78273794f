// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{AgentKind, BoundedString, SessionStatus};

/// One user's agent session: the record held by the daemon and sent to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSession {
    pub status: SessionStatus,
    pub kind: AgentKind,
    /// Agent process id, 0 when no process is live
    pub process_id: i32,
    /// The agent's own socket (`SSH_AUTH_SOCK`)
    pub socket_path: BoundedString,
    /// `GPG_AGENT_INFO` for gpg-agent sessions, empty otherwise
    pub auxiliary_info: BoundedString,
    /// Set only on the response for the spawn that created the agent
    pub first_observation: bool,
}

impl AgentSession {
    /// An empty record for `kind`, as stored before the first spawn.
    pub fn stopped(kind: AgentKind) -> Self {
        Self { kind, ..Self::default() }
    }

    /// Whether the session points at a usable agent.
    pub fn is_usable(&self) -> bool {
        matches!(self.status, SessionStatus::Started | SessionStatus::Running)
            && self.process_id > 0
    }

    /// Path of gpg-agent's control socket: the info string up to its first `:`.
    pub fn control_socket(&self) -> Option<&str> {
        let info = self.auxiliary_info.as_str();
        let path = info.split(':').next().unwrap_or(info);
        (!path.is_empty()).then_some(path)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
