// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variables describing a session.

use std::time::Duration;

use envoy_wire::{AgentKind, AgentSession};

use crate::gpg::{self, GpgError, Refusal, TtyContext};

/// Variables a child process needs to reach the agent.
pub fn variables(session: &AgentSession) -> Vec<(&'static str, String)> {
    let mut vars = Vec::with_capacity(2);
    if !session.auxiliary_info.is_empty() {
        vars.push(("GPG_AGENT_INFO", session.auxiliary_info.to_string()));
    }
    vars.push(("SSH_AUTH_SOCK", session.socket_path.to_string()));
    vars
}

/// Export the session into this process's environment, inherited by
/// anything exec'd afterwards.
pub fn apply(session: &AgentSession) {
    for (name, value) in variables(session) {
        std::env::set_var(name, value);
    }
}

/// Make `session` this process's agent: point gpg-agent at the caller's
/// terminal, then export the variables.
///
/// The variables are exported even when gpg-agent cannot be reached.
pub async fn activate(session: &AgentSession, timeout: Duration) -> Result<Vec<Refusal>, GpgError> {
    let refused = match session.kind {
        AgentKind::GpgAgent => gpg::update_tty(session, &TtyContext::from_env(), timeout).await,
        AgentKind::SshAgent => Ok(Vec::new()),
    };
    apply(session);
    refused
}

/// Shell commands exporting the session, one per line.
pub fn export_lines(session: &AgentSession) -> String {
    let mut out = String::new();
    if session.kind == AgentKind::GpgAgent {
        out.push_str(&export("GPG_AGENT_INFO", session.auxiliary_info.as_str()));
    }
    out.push_str(&export("SSH_AUTH_SOCK", session.socket_path.as_str()));
    out.push_str(&export("SSH_AGENT_PID", &session.process_id.to_string()));
    out
}

fn export(name: &str, value: &str) -> String {
    format!("export {name}={}\n", shell_quote(value))
}

/// Single-quote `value` for POSIX shells.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "environ_tests.rs"]
mod tests;
