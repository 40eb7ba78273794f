// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! envoy: fetch this user's agent from envoyd and act on it

use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser};
use envoy::actions::{self, Action};
use envoy::{client, environ, exec, ExitError};
use envoy_wire::{AgentKind, AgentSession, KindRequest};

#[derive(Parser)]
#[command(name = "envoy", version, disable_version_flag = true)]
#[command(about = "Start or reuse your ssh-agent/gpg-agent through envoyd")]
#[command(group(ArgGroup::new("action").multiple(false)))]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Add private key identities
    #[arg(short = 'a', long, group = "action")]
    add: bool,

    /// Force identities to expire (gpg-agent only)
    #[arg(short = 'k', long, group = "action")]
    clear: bool,

    /// Kill the running agent
    #[arg(short = 'K', long, group = "action")]
    kill: bool,

    /// List fingerprints of all loaded identities
    #[arg(short = 'l', long, group = "action")]
    list: bool,

    /// Print out environment exports
    #[arg(short = 'p', long, group = "action")]
    print: bool,

    /// Agent to start if none is running (ssh-agent, gpg-agent)
    #[arg(short = 't', long, value_name = "AGENT")]
    agent: Option<AgentKind>,

    /// Key files to add; bare names are looked up in ~/.ssh
    keys: Vec<String>,
}

impl Cli {
    fn action(&self) -> Action {
        if self.add {
            Action::ForceAdd
        } else if self.clear {
            Action::Clear
        } else if self.kill {
            Action::Kill
        } else if self.list {
            Action::List
        } else if self.print {
            Action::Print
        } else {
            Action::Add
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();
    let result = if exec::invoked_name(args.first()) == "ssh" {
        run_ssh(args.into_iter().skip(1))
    } else {
        run(Cli::parse_from(args))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("envoy: {e:#}");
            e.downcast_ref::<ExitError>().map(ExitError::exit_code).unwrap_or(ExitCode::FAILURE)
        }
    }
}

/// Resolve a session and, when asked, make it this process's agent.
fn fetch(request: KindRequest, activate: bool) -> Result<AgentSession> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async {
        let session = client::resolve_default(request).await.map_err(ExitError::from)?;
        if activate {
            match environ::activate(&session, envoy_daemon::env::ipc_timeout()).await {
                Ok(refused) => {
                    for r in refused {
                        eprintln!("envoy: gpg-agent refused {}: {}", r.command, r.reply);
                    }
                }
                Err(e) => eprintln!("envoy: failed to update gpg-agent tty: {e}"),
            }
        }
        Ok::<_, anyhow::Error>(session)
    })
}

fn run(cli: Cli) -> Result<()> {
    let action = cli.action();
    let session = fetch(KindRequest::from(cli.agent), action.applies_session())?;

    match action {
        Action::Print => print!("{}", environ::export_lines(&session)),
        Action::Add | Action::ForceAdd => {
            if actions::wants_keys(action, &session) {
                let home = dirs::home_dir().context("failed to find home directory")?;
                return Err(actions::exec(actions::ssh_add(&cli.keys, &home)).into());
            }
        }
        Action::List => return Err(actions::exec(actions::ssh_add_list()).into()),
        Action::Clear | Action::Kill => {
            if let Some(signal) = actions::signal_for(action, &session)? {
                actions::signal_agent(&session, signal)?;
            }
        }
    }
    Ok(())
}

/// Invoked as `ssh`: use the preferred agent, then become the real ssh.
fn run_ssh(args: impl Iterator<Item = OsString>) -> Result<()> {
    fetch(KindRequest::Preferred, true)?;
    Err(actions::exec(actions::ssh(args)).into())
}
