// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! envoy-exec: run a command with this user's agent in its environment

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use clap::{ArgAction, Parser};
use envoy::exec::{self, Target, EXEC_NAME};
use envoy::{client, environ};
use envoy_wire::{AgentKind, KindRequest};

#[derive(Parser)]
#[command(name = "envoy-exec", version, disable_version_flag = true)]
#[command(about = "Run a command with your ssh-agent/gpg-agent from envoyd")]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Agent to start if none is running (ssh-agent, gpg-agent)
    #[arg(short = 't', long, value_name = "AGENT")]
    agent: Option<AgentKind>,

    /// Command to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();

    // Reached as a symlink or script interpreter: every argument belongs
    // to the wrapped command.
    let (request, argv) = if exec::invoked_name(args.first()) == EXEC_NAME {
        let cli = Cli::parse_from(args);
        (KindRequest::from(cli.agent), cli.command)
    } else {
        (KindRequest::Preferred, args)
    };

    prepare_environment(request);

    let Some((argv0, rest)) = argv.split_first() else {
        eprintln!("envoy-exec: no command given");
        return ExitCode::FAILURE;
    };
    let argv0 = argv0.to_string_lossy();
    let self_exe = std::env::current_exe()
        .and_then(std::fs::canonicalize)
        .unwrap_or_else(|_| PathBuf::from(EXEC_NAME));
    let target = Target::resolve(&argv0, &self_exe);

    for candidate in target.candidates(std::env::var_os("PATH").as_deref()) {
        // exec only returns on failure; move on to the next match
        let err = Command::new(&candidate).arg0(&target.command).args(rest).exec();
        eprintln!("envoy-exec: failed to run {}: {err}", candidate.display());
    }

    eprintln!("envoy-exec: command {} not found", target.command);
    ExitCode::FAILURE
}

/// Put the agent in the environment. A missing or broken daemon is reported
/// but never stops the command from running.
fn prepare_environment(request: KindRequest) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("envoy-exec: failed to start runtime: {e}");
            return;
        }
    };

    runtime.block_on(async {
        let session = match client::resolve_default(request).await {
            Ok(session) => session,
            Err(e) => {
                eprintln!("envoy-exec: {e}");
                return;
            }
        };
        match environ::activate(&session, envoy_daemon::env::ipc_timeout()).await {
            Ok(refused) => {
                for r in refused {
                    eprintln!("envoy-exec: gpg-agent refused {}: {}", r.command, r.reply);
                }
            }
            Err(e) => eprintln!("envoy-exec: failed to update gpg-agent tty: {e}"),
        }
    });
}
