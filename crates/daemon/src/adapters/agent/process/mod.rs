// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real agent processes: spawn under a user's identity, capture the
//! announcement, wait for the launcher to exit.

mod announcement;

pub(crate) use announcement::parse_announcement;

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use envoy_wire::{AgentKind, AgentSession, SessionStatus};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::{Pid, Uid, User};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use super::{AgentLauncher, Identity, Liveness, SpawnError};

/// Upper bound on announcement text kept from an agent.
const MAX_ANNOUNCEMENT: u64 = 64 * 1024;

/// Terminal device handed to agents so gpg-agent starts without a tty.
const AGENT_TTY: &str = "/dev/null";

/// A binary and its fixed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProgram {
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl AgentProgram {
    /// The standard invocation of `kind` found at `path`.
    pub fn for_kind(kind: AgentKind, path: impl Into<PathBuf>) -> Self {
        let args: &[&str] = match kind {
            AgentKind::SshAgent => &[],
            AgentKind::GpgAgent => &["--daemon", "--enable-ssh-support"],
        };
        Self { path: path.into(), args: args.iter().map(|s| s.to_string()).collect() }
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Launches agents as child processes of the daemon.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    ssh_agent: AgentProgram,
    gpg_agent: AgentProgram,
    read_timeout: Duration,
}

impl ProcessSupervisor {
    pub fn new(ssh_agent: AgentProgram, gpg_agent: AgentProgram, read_timeout: Duration) -> Self {
        Self { ssh_agent, gpg_agent, read_timeout }
    }

    fn program(&self, kind: AgentKind) -> &AgentProgram {
        match kind {
            AgentKind::SshAgent => &self.ssh_agent,
            AgentKind::GpgAgent => &self.gpg_agent,
        }
    }
}

#[async_trait]
impl AgentLauncher for ProcessSupervisor {
    async fn launch(
        &self,
        kind: AgentKind,
        identity: Identity,
    ) -> Result<AgentSession, SpawnError> {
        let program = self.program(kind);
        let name = program.name();
        let home = home_dir(identity.uid)?;

        info!(agent = %name, uid = identity.uid, gid = identity.gid, "starting agent");

        let mut child = match spawn_as(program, identity, &home) {
            Ok(child) => child,
            Err(SpawnError::Spawn { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                error!(agent = %name, path = %program.path.display(), "agent binary not found");
                return Ok(failed(kind));
            }
            Err(e) => return Err(e),
        };

        let stdout = child.stdout.take().ok_or_else(|| SpawnError::Pipe(name.clone()))?;
        let output = match tokio::time::timeout(self.read_timeout, read_announcement(stdout)).await
        {
            Ok(result) => result.map_err(|source| SpawnError::Read { program: name.clone(), source })?,
            Err(_) => {
                warn!(agent = %name, "agent did not finish its announcement in time, killing it");
                kill_unannounced(&mut child, &name);
                child.wait().await.map_err(|source| SpawnError::Wait { program: name, source })?;
                return Ok(failed(kind));
            }
        };

        let status =
            child.wait().await.map_err(|source| SpawnError::Wait { program: name.clone(), source })?;
        if let Some(diagnostic) = exit_diagnostic(status) {
            warn!(agent = %name, uid = identity.uid, "{} {}", name, diagnostic);
            return Ok(failed(kind));
        }

        let mut session = parse_announcement(kind, &output);
        if session.process_id <= 0 {
            warn!(agent = %name, uid = identity.uid, "agent announced no process id");
            return Ok(failed(kind));
        }
        session.status = SessionStatus::Started;
        session.first_observation = true;

        info!(
            agent = %name,
            uid = identity.uid,
            pid = session.process_id,
            socket = %session.socket_path,
            "agent started"
        );
        Ok(session)
    }

    fn probe(&self, pid: i32) -> Liveness {
        probe_pid(pid)
    }

    fn terminate(&self, pid: i32) -> Result<(), nix::Error> {
        if pid <= 0 {
            return Err(Errno::ESRCH);
        }
        kill(Pid::from_raw(pid), Signal::SIGTERM)
    }
}

/// Spawn `program` as `identity` with stdout captured.
///
/// The child sets its group id before its user id, and clears supplementary
/// groups when the daemon is root, so no elevated group survives the switch.
pub(crate) fn spawn_as(
    program: &AgentProgram,
    identity: Identity,
    home: &Path,
) -> Result<Child, SpawnError> {
    let mut cmd = Command::new(&program.path);
    cmd.args(&program.args)
        .env("HOME", home)
        .env("GPG_TTY", AGENT_TTY)
        .gid(identity.gid)
        .uid(identity.uid)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    cmd.spawn().map_err(|source| SpawnError::Spawn { program: program.name(), source })
}

/// Home directory of `uid` from the passwd database.
pub(crate) fn home_dir(uid: u32) -> Result<PathBuf, SpawnError> {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Ok(user.dir),
        Ok(None) => Err(SpawnError::NoPasswdEntry(uid)),
        Err(source) => Err(SpawnError::PasswdLookup { uid, source }),
    }
}

/// Signal-0 probe. Only `ESRCH` means the process is gone.
pub(crate) fn probe_pid(pid: i32) -> Liveness {
    if pid <= 0 {
        return Liveness::Gone;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => Liveness::Alive,
        Err(Errno::ESRCH) => Liveness::Gone,
        Err(e) => {
            warn!(pid, error = %e, "unexpected liveness probe failure, assuming alive");
            Liveness::Alive
        }
    }
}

/// Kill an agent that never finished announcing itself. Returns whether the
/// kill was delivered.
pub(crate) fn kill_unannounced(child: &mut Child, name: &str) -> bool {
    match child.start_kill() {
        Ok(()) => true,
        Err(e) => {
            warn!(agent = %name, error = %e, "failed to kill unannounced agent");
            false
        }
    }
}

async fn read_announcement<R: AsyncRead + Unpin>(stdout: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    stdout.take(MAX_ANNOUNCEMENT).read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Describe an unsuccessful exit, or `None` for success.
fn exit_diagnostic(status: ExitStatus) -> Option<String> {
    if status.success() {
        return None;
    }
    Some(match (status.code(), status.signal()) {
        (Some(code), _) => format!("exited with status {code}"),
        (None, Some(signal)) => format!("terminated with signal {signal}"),
        (None, None) => status.to_string(),
    })
}

fn failed(kind: AgentKind) -> AgentSession {
    AgentSession { status: SessionStatus::Failed, ..AgentSession::stopped(kind) }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
