// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! envoyd: per-user ssh-agent/gpg-agent broker

use std::process::ExitCode;

use clap::{ArgAction, Parser};
use envoy_daemon::{env, Config};
use envoy_wire::AgentKind;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "envoyd", version, disable_version_flag = true)]
#[command(about = "Start and hand out one ssh-agent or gpg-agent per user")]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Agent to start when a client does not ask for one (ssh-agent, gpg-agent)
    #[arg(short = 'a', long, value_name = "AGENT", default_value_t = AgentKind::SshAgent)]
    agent: AgentKind,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env::log_filter()))
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("envoyd: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(envoy_daemon::run(Config::load(cli.agent))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "envoyd exiting");
            eprintln!("envoyd: {e}");
            ExitCode::FAILURE
        }
    }
}
