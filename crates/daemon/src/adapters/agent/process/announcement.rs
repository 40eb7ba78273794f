// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for the shell snippet agents print on startup, e.g.
//!
//! ```text
//! SSH_AUTH_SOCK=/tmp/ssh-XXXX/agent.41; export SSH_AUTH_SOCK;
//! SSH_AGENT_PID=42; export SSH_AGENT_PID;
//! echo Agent pid 42;
//! ```

use envoy_wire::{AgentKind, AgentSession, BoundedString};
use tracing::{debug, warn};

/// Build a session from announcement text. Unknown lines are ignored.
pub(crate) fn parse_announcement(kind: AgentKind, text: &str) -> AgentSession {
    let mut session = AgentSession::stopped(kind);
    for (var, value) in text.lines().filter_map(assignment) {
        match var {
            "SSH_AUTH_SOCK" => set_bounded(&mut session.socket_path, var, value),
            "GPG_AGENT_INFO" => set_bounded(&mut session.auxiliary_info, var, value),
            "SSH_AGENT_PID" => match value.parse::<i32>() {
                Ok(pid) if pid > 0 => session.process_id = pid,
                _ => warn!(value, "ignoring invalid SSH_AGENT_PID"),
            },
            _ => debug!(var, "ignoring announcement variable"),
        }
    }
    session
}

/// Split `VAR=value[; annotation]` into its name and value.
fn assignment(line: &str) -> Option<(&str, &str)> {
    let statement = line.split(';').next().unwrap_or(line);
    let (var, value) = statement.split_once('=')?;
    Some((var.trim(), value.trim()))
}

fn set_bounded(field: &mut BoundedString, var: &str, value: &str) {
    match BoundedString::new(value) {
        Ok(bounded) => *field = bounded,
        Err(e) => warn!(var, error = %e, "ignoring announced value"),
    }
}

#[cfg(test)]
#[path = "announcement_tests.rs"]
mod tests;
