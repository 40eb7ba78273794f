// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for client binary specs.

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub use envoy_wire::{AgentKind, AgentSession, BoundedString, SessionStatus};
pub use serial_test::serial;
pub use tempfile::TempDir;

/// Maximum time a client binary may run.
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

pub fn bin_path(name: &str) -> PathBuf {
    assert_cmd::cargo::cargo_bin(name)
}

/// `envoy` with no inherited agent variables.
pub fn envoy() -> Cli {
    Cli::new(Command::new(bin_path("envoy")))
}

/// `envoy-exec` with no inherited agent variables.
pub fn envoy_exec() -> Cli {
    Cli::new(Command::new(bin_path("envoy-exec")))
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn new(mut cmd: Command) -> Self {
        cmd.env_remove("SSH_AUTH_SOCK")
            .env_remove("GPG_AGENT_INFO")
            .env("ENVOY_SOCKET", "/nonexistent/envoy.sock")
            .env("ENVOY_IPC_TIMEOUT_MS", "2000");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn env_remove(mut self, key: &str) -> Self {
        self.cmd.env_remove(key);
        self
    }

    /// Talk to `daemon` instead of the unreachable default.
    pub fn daemon(mut self, daemon: &FakeDaemon) -> Self {
        self.cmd.env("ENVOY_SOCKET", &daemon.socket);
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

    /// Run with no terminal on stdin, killing the process if it outlives the
    /// spec wait.
    fn run(mut self) -> RunOutput {
        let mut child = self
            .cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
        while child.try_wait().unwrap().is_none() {
            if Instant::now() >= deadline {
                let _ = child.kill();
                let output = child.wait_with_output().unwrap();
                panic!(
                    "still running after {SPEC_WAIT_MAX_MS}ms\nstderr: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            std::thread::sleep(Duration::from_millis(10));
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

    pub fn stdout_is(self, expected: &str) -> Self {
        assert_eq!(self.stdout, expected);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }

    pub fn stderr_lacks(self, needle: &str) -> Self {
        assert!(!self.stderr.contains(needle), "stderr has {needle:?}:\n{}", self.stderr);
        self
    }
}

/// What the fake daemon does with each request.
#[derive(Clone)]
pub enum Reply {
    Session(AgentSession),
    /// Close without answering, the way envoyd turns away another user
    Hangup,
}

/// An envoyd stand-in answering every connection with a canned reply.
pub struct FakeDaemon {
    pub dir: TempDir,
    pub socket: PathBuf,
    requests: Arc<Mutex<Vec<u32>>>,
}

impl FakeDaemon {
    pub fn start(reply: Reply) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("envoy.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { return };
                let mut code = [0u8; 4];
                if stream.read_exact(&mut code).is_err() {
                    continue;
                }
                seen.lock().unwrap().push(u32::from_le_bytes(code));
                if let Reply::Session(session) = &reply {
                    let _ = stream.write_all(&envoy_wire::encode_session(session));
                }
            }
        });

        Self { dir, socket, requests }
    }

    /// Kind codes received so far.
    pub fn requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().clone()
    }
}

/// A running ssh-agent session as envoyd reports it.
pub fn ssh_session(process_id: i32) -> AgentSession {
    AgentSession {
        status: SessionStatus::Running,
        kind: AgentKind::SshAgent,
        process_id,
        socket_path: BoundedString::new("/tmp/envoy-spec/agent.4241").unwrap(),
        ..AgentSession::default()
    }
}

/// A gpg-agent control socket that greets, then acknowledges every command.
pub struct FakeGpgAgent {
    pub socket: PathBuf,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeGpgAgent {
    pub fn start(dir: &Path) -> Self {
        let socket = dir.join("S.gpg-agent");
        let listener = UnixListener::bind(&socket).unwrap();
        let commands = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&commands);
        std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else { return };
            if stream.write_all(b"OK Pleased to meet you\n").is_err() {
                return;
            }
            let Ok(read_half) = stream.try_clone() else { return };
            for line in BufReader::new(read_half).lines() {
                let Ok(line) = line else { return };
                // Recorded before the acknowledgement, so the client cannot
                // finish ahead of the log
                seen.lock().unwrap().push(line);
                if stream.write_all(b"OK\n").is_err() {
                    return;
                }
            }
        });

        Self { socket, commands }
    }

    /// Commands received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// A gpg-agent session pointing at this control socket.
    pub fn session(&self, process_id: i32) -> AgentSession {
        let info = format!("{}:{process_id}:1", self.socket.display());
        AgentSession {
            status: SessionStatus::Running,
            kind: AgentKind::GpgAgent,
            process_id,
            socket_path: BoundedString::new(format!("{}.ssh", self.socket.display())).unwrap(),
            auxiliary_info: BoundedString::new(info).unwrap(),
            ..AgentSession::default()
        }
    }
}
