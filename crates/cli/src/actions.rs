// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What `envoy` does with a session once it has one.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use envoy_wire::{AgentKind, AgentSession};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::exit_error::ExitError;

pub const SSH_ADD: &str = "/usr/bin/ssh-add";
pub const SSH: &str = "/usr/bin/ssh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Add keys to a freshly started agent
    #[default]
    Add,
    /// Add keys whatever the agent's state
    ForceAdd,
    /// Make gpg-agent forget its cached passphrases
    Clear,
    /// Terminate the agent
    Kill,
    /// List loaded identities
    List,
    /// Print shell exports
    Print,
}

impl Action {
    /// Whether the session is applied to this process (and gpg-agent told
    /// about the terminal) before acting.
    pub fn applies_session(self) -> bool {
        !matches!(self, Action::Clear | Action::Kill)
    }
}

/// Whether `action` should run ssh-add against `session`.
///
/// A plain add only loads keys into an agent nobody has seen yet; gpg-agent
/// keeps its own keys, so there it is a no-op.
pub fn wants_keys(action: Action, session: &AgentSession) -> bool {
    match action {
        Action::ForceAdd => true,
        Action::Add => session.first_observation && session.kind != AgentKind::GpgAgent,
        _ => false,
    }
}

/// An existing path is used as given; anything else names a key in `~/.ssh`.
pub fn key_path(home: &Path, fragment: &str) -> PathBuf {
    let path = Path::new(fragment);
    if path.exists() {
        path.to_path_buf()
    } else {
        home.join(".ssh").join(fragment)
    }
}

/// `ssh-add -- <keys>`. No keys means ssh-add's default identities.
pub fn ssh_add(keys: &[String], home: &Path) -> Command {
    let mut cmd = Command::new(SSH_ADD);
    cmd.arg("--").args(keys.iter().map(|key| key_path(home, key)));
    cmd
}

/// `ssh-add -l`
pub fn ssh_add_list() -> Command {
    let mut cmd = Command::new(SSH_ADD);
    cmd.arg("-l");
    cmd
}

/// `ssh` with the caller's arguments.
pub fn ssh(args: impl IntoIterator<Item = std::ffi::OsString>) -> Command {
    let mut cmd = Command::new(SSH);
    cmd.args(args);
    cmd
}

/// Signal sent to the agent for `action`, if any.
pub fn signal_for(action: Action, session: &AgentSession) -> Result<Option<Signal>, ExitError> {
    match action {
        Action::Clear if session.kind == AgentKind::GpgAgent => Ok(Some(Signal::SIGHUP)),
        Action::Clear => Err(ExitError::new(1, "only gpg-agent supports this operation")),
        Action::Kill => Ok(Some(Signal::SIGTERM)),
        _ => Ok(None),
    }
}

pub fn signal_agent(session: &AgentSession, signal: Signal) -> Result<(), ExitError> {
    if session.process_id <= 0 {
        return Err(ExitError::new(1, "agent has no process id"));
    }
    kill(Pid::from_raw(session.process_id), signal).map_err(|e| {
        ExitError::new(1, format!("failed to send {} to agent {}: {}", signal, session.process_id, e))
    })
}

/// Replace this process with `cmd`. Only returns on failure.
pub fn exec(mut cmd: Command) -> ExitError {
    let err = cmd.exec();
    ExitError::new(1, format!("failed to launch {}: {}", cmd.get_program().to_string_lossy(), err))
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
