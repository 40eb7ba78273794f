// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapters for external I/O

pub mod agent;

pub use agent::{AgentLauncher, AgentProgram, Identity, Liveness, ProcessSupervisor, SpawnError};

// Test support - only compiled for tests
#[cfg(test)]
pub use agent::FakeLauncher;
