// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for envoyd binary specs.

use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

pub use envoy_wire::{AgentKind, AgentSession, KindRequest, SessionStatus};
pub use serial_test::serial;
pub use tempfile::TempDir;

/// Maximum time to wait for the daemon to reach a state.
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

pub fn envoyd_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin("envoyd")
}

/// `envoyd` with a clean environment for one-shot invocations.
pub fn envoyd() -> Cli {
    let mut cmd = Command::new(envoyd_path());
    cmd.env_remove("LISTEN_FDS").env_remove("LISTEN_PID");
    Cli { cmd }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(self) -> RunOutput {
        let run = self.run();
        assert!(run.status.success(), "expected success, got {}\n{}", run.status, run.stderr);
        run
    }

    pub fn fails(self) -> RunOutput {
        let run = self.run();
        assert!(!run.status.success(), "expected failure\nstdout: {}", run.stdout);
        run
    }

    /// Run to completion, killing the process if it outlives the spec wait.
    fn run(mut self) -> RunOutput {
        let mut child =
            self.cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn().unwrap();
        let exited = wait_for(SPEC_WAIT_MAX_MS, || child.try_wait().unwrap().is_some());
        if !exited {
            let _ = child.kill();
            let output = child.wait_with_output().unwrap();
            panic!(
                "envoyd still running after {SPEC_WAIT_MAX_MS}ms\nstderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        RunOutput::from(child.wait_with_output().unwrap())
    }
}

pub struct RunOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl RunOutput {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }
}

/// Forks a sleeper standing in for the agent and prints ssh-agent's
/// announcement for it.
pub const FAKE_SSH_AGENT: &str = "sleep 30 >/dev/null 2>&1 &
echo \"SSH_AUTH_SOCK=/tmp/envoy-spec/agent.$!; export SSH_AUTH_SOCK;\"
echo \"SSH_AGENT_PID=$!; export SSH_AGENT_PID;\"
echo \"echo Agent pid $!;\"
";

/// A throwaway daemon bound to a socket in its own temp directory.
pub struct Daemon {
    dir: TempDir,
    pub socket: PathBuf,
    child: Option<Child>,
}

impl Daemon {
    /// Start envoyd with a fake ssh-agent that forks a sleeper and announces it.
    pub fn start() -> Self {
        Self::with_agent(FAKE_SSH_AGENT)
    }

    /// Start envoyd with `agent_body` as its ssh-agent script.
    pub fn with_agent(agent_body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let agent = write_script(dir.path(), "fake-ssh-agent", agent_body);
        let socket = dir.path().join("envoy.sock");
        let child = Command::new(envoyd_path())
            .env_remove("LISTEN_FDS")
            .env_remove("LISTEN_PID")
            .env("ENVOY_SOCKET", &socket)
            .env("ENVOY_SSH_AGENT", &agent)
            .env("ENVOY_LOG", "debug")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        // The socket file appears at bind, before the daemon listens
        let daemon = Self { dir, socket, child: Some(child) };
        assert!(
            wait_for(SPEC_WAIT_MAX_MS, || UnixStream::connect(&daemon.socket).is_ok()),
            "daemon never accepted connections"
        );
        daemon
    }

    /// Lock file held while the daemon runs.
    pub fn lock_path(&self) -> PathBuf {
        self.dir.path().join("envoy.lock")
    }

    /// Connect, send `kind`, and read the reply.
    pub fn request(&self, kind: KindRequest) -> Result<AgentSession, envoy_wire::ProtocolError> {
        let timeout = Duration::from_secs(5);
        let runtime =
            tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let mut stream = tokio::net::UnixStream::connect(&self.socket).await?;
            envoy_wire::write_request(&mut stream, kind, timeout).await?;
            envoy_wire::read_session(&mut stream, timeout).await
        })
    }

    /// Send SIGTERM and wait for the exit status.
    pub fn terminate(&mut self) -> ExitStatus {
        let mut child = self.child.take().unwrap();
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM).unwrap();

        let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
        loop {
            if let Some(status) = child.try_wait().unwrap() {
                return status;
            }
            assert!(Instant::now() < deadline, "daemon did not exit after SIGTERM");
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Write an executable `/bin/sh` script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Poll `cond` every 10ms until it holds or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}
