// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tell a running gpg-agent which terminal and display to prompt on.
//!
//! gpg-agent speaks the line-based Assuan protocol on its control socket:
//! the server greets with `OK`, every command gets a final `OK` or `ERR`
//! line, and status (`S`), comment (`#`) and data (`D`) lines may come first.

use std::path::PathBuf;
use std::time::Duration;

use envoy_wire::AgentSession;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum GpgError {
    #[error("gpg-agent info names no control socket")]
    NoSocket,

    #[error("failed to connect to gpg-agent at {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("incorrect response from gpg-agent: {0}")]
    Greeting(String),

    #[error("gpg-agent closed the connection")]
    Closed,

    #[error("timed out talking to gpg-agent")]
    Timeout,

    #[error("gpg-agent I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The caller's terminal and display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TtyContext {
    /// Terminal on stdin, if any
    pub ttyname: Option<String>,
    /// `TERM`
    pub term: Option<String>,
    /// `DISPLAY`
    pub display: Option<String>,
    /// Home directory, for the X authority file
    pub home: Option<PathBuf>,
}

impl TtyContext {
    pub fn from_env() -> Self {
        Self {
            ttyname: nix::unistd::ttyname(std::io::stdin())
                .ok()
                .map(|path| path.display().to_string()),
            term: non_empty_var("TERM"),
            display: non_empty_var("DISPLAY"),
            home: dirs::home_dir(),
        }
    }

    /// Commands that hand this context to the agent, in order.
    pub fn commands(&self) -> Vec<String> {
        let mut commands = vec!["RESET".to_string()];
        if let Some(tty) = &self.ttyname {
            commands.push(format!("OPTION ttyname={tty}"));
        }
        if let Some(term) = &self.term {
            commands.push(format!("OPTION ttytype={term}"));
        }
        if let Some(display) = &self.display {
            commands.push(format!("OPTION display={display}"));
            if let Some(home) = &self.home {
                commands.push(format!("OPTION xauthority={}", home.join(".Xauthority").display()));
            }
        }
        commands.push("UPDATESTARTUPTTY".to_string());
        commands
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// A command the agent answered with something other than `OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    pub command: String,
    pub reply: String,
}

/// Connect to the session's control socket and send the context.
///
/// Returns the commands the agent refused; the remaining ones are still sent.
pub async fn update_tty(
    session: &AgentSession,
    context: &TtyContext,
    timeout: Duration,
) -> Result<Vec<Refusal>, GpgError> {
    let path = session.control_socket().ok_or(GpgError::NoSocket)?;
    let exchange = async {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| GpgError::Connect { path: path.to_string(), source })?;
        let (read, mut write) = stream.into_split();
        notify(&mut BufReader::new(read), &mut write, context).await
    };
    tokio::time::timeout(timeout, exchange).await.map_err(|_| GpgError::Timeout)?
}

/// Run the notification conversation over an established connection.
pub async fn notify<R, W>(
    reader: &mut R,
    writer: &mut W,
    context: &TtyContext,
) -> Result<Vec<Refusal>, GpgError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = read_reply(reader).await?;
    if !greeting.starts_with("OK") {
        return Err(GpgError::Greeting(greeting));
    }

    let mut refused = Vec::new();
    for command in context.commands() {
        writer.write_all(format!("{command}\n").as_bytes()).await?;
        writer.flush().await?;
        let reply = read_reply(reader).await?;
        if !reply.starts_with("OK") {
            refused.push(Refusal { command, reply });
        }
    }
    Ok(refused)
}

/// Next final response line, skipping status, comment and data lines.
async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, GpgError> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(GpgError::Closed);
        }
        let reply = line.trim_end_matches(['\r', '\n']);
        if !is_informational(reply) {
            return Ok(reply.to_string());
        }
    }
}

fn is_informational(line: &str) -> bool {
    line == "S" || line.starts_with("S ") || line.starts_with('#') || line.starts_with("D ")
}

#[cfg(test)]
#[path = "gpg_tests.rs"]
mod tests;
