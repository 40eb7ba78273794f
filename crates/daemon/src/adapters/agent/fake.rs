// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory launcher for tests

use std::collections::HashSet;

use async_trait::async_trait;
use envoy_wire::{AgentKind, AgentSession, BoundedString, SessionStatus};
use nix::errno::Errno;
use parking_lot::Mutex;

use super::{AgentLauncher, Identity, Liveness, SpawnError};

/// Hands out sequential pids starting at 4242 and tracks which are alive.
pub struct FakeLauncher {
    state: Mutex<FakeState>,
}

struct FakeState {
    next_pid: i32,
    alive: HashSet<i32>,
    launches: Vec<(AgentKind, Identity)>,
    terminated: Vec<i32>,
    fail_next: bool,
    fatal_next: bool,
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_pid: 4242,
                alive: HashSet::new(),
                launches: Vec::new(),
                terminated: Vec::new(),
                fail_next: false,
                fatal_next: false,
            }),
        }
    }

    /// Simulate the agent dying outside the daemon's control.
    pub fn kill_externally(&self, pid: i32) {
        self.state.lock().alive.remove(&pid);
    }

    /// Mark a pid alive without launching it.
    pub fn adopt(&self, pid: i32) {
        self.state.lock().alive.insert(pid);
    }

    /// Make the next launch report an agent that exited nonzero.
    pub fn fail_next_launch(&self) {
        self.state.lock().fail_next = true;
    }

    /// Make the next launch hit an unrecoverable spawn error.
    pub fn break_next_launch(&self) {
        self.state.lock().fatal_next = true;
    }

    pub fn launches(&self) -> Vec<(AgentKind, Identity)> {
        self.state.lock().launches.clone()
    }

    pub fn terminated(&self) -> Vec<i32> {
        self.state.lock().terminated.clone()
    }

    pub fn alive_count(&self) -> usize {
        self.state.lock().alive.len()
    }
}

#[async_trait]
impl AgentLauncher for FakeLauncher {
    async fn launch(
        &self,
        kind: AgentKind,
        identity: Identity,
    ) -> Result<AgentSession, SpawnError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fatal_next) {
            return Err(SpawnError::Pipe(kind.to_string()));
        }
        state.launches.push((kind, identity));
        if std::mem::take(&mut state.fail_next) {
            return Ok(AgentSession { status: SessionStatus::Failed, ..AgentSession::stopped(kind) });
        }

        let pid = state.next_pid;
        state.next_pid += 1;
        state.alive.insert(pid);

        let socket = format!("/tmp/envoy-fake/{}/agent.{pid}", identity.uid);
        let info = match kind {
            AgentKind::GpgAgent => format!("/tmp/envoy-fake/{}/S.gpg-agent:{pid}:1", identity.uid),
            AgentKind::SshAgent => String::new(),
        };
        Ok(AgentSession {
            status: SessionStatus::Started,
            kind,
            process_id: pid,
            socket_path: BoundedString::new(socket).unwrap_or_default(),
            auxiliary_info: BoundedString::new(info).unwrap_or_default(),
            first_observation: true,
        })
    }

    fn probe(&self, pid: i32) -> Liveness {
        if pid > 0 && self.state.lock().alive.contains(&pid) {
            Liveness::Alive
        } else {
            Liveness::Gone
        }
    }

    fn terminate(&self, pid: i32) -> Result<(), nix::Error> {
        let mut state = self.state.lock();
        state.terminated.push(pid);
        if state.alive.remove(&pid) {
            Ok(())
        } else {
            Err(Errno::ESRCH)
        }
    }
}
