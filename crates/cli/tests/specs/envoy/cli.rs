// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! envoy command line specs

use crate::prelude::*;

#[test]
#[serial]
fn help_lists_actions() {
    envoy()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("--kill")
        .stdout_has("--print");
}

#[test]
#[serial]
fn short_v_prints_version() {
    envoy().args(&["-v"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
#[serial]
fn unknown_agent_is_rejected() {
    envoy().args(&["-t", "pageant", "-p"]).fails().stderr_has("unknown agent: pageant");
}

#[test]
#[serial]
fn actions_are_exclusive() {
    envoy().args(&["-p", "-K"]).fails().stderr_has("cannot be used with");
}

#[test]
#[serial]
fn missing_daemon_is_reported() {
    envoy().args(&["-p"]).fails().stderr_has("failed to connect to envoyd");
}

#[test]
#[serial]
fn rejected_connection_is_reported() {
    let daemon = FakeDaemon::start(Reply::Hangup);

    envoy()
        .daemon(&daemon)
        .args(&["-p"])
        .fails()
        .stderr_has("connection rejected, user is unauthorized to use this agent");
}

#[test]
#[serial]
fn failed_agent_is_reported() {
    let failed = AgentSession { status: SessionStatus::Failed, ..AgentSession::default() };
    let daemon = FakeDaemon::start(Reply::Session(failed));

    envoy()
        .daemon(&daemon)
        .args(&["-p"])
        .fails()
        .stderr_has("agent failed to start, check envoyd's log");
}

#[test]
#[serial]
fn agent_flag_selects_the_request() {
    let daemon = FakeDaemon::start(Reply::Session(ssh_session(4242)));

    envoy().daemon(&daemon).args(&["-p"]).passes();
    envoy().daemon(&daemon).args(&["-p", "-t", "ssh-agent"]).passes();

    assert_eq!(daemon.requests(), vec![u32::MAX, 0]);
}
