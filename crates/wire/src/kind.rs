// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent kinds the broker knows how to launch.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Which credential agent a session refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AgentKind {
    /// OpenSSH `ssh-agent`
    #[default]
    SshAgent,
    /// `gpg-agent` with ssh support enabled
    GpgAgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown agent: {0}")]
pub struct UnknownAgent(pub String);

impl AgentKind {
    pub const ALL: [AgentKind; 2] = [AgentKind::SshAgent, AgentKind::GpgAgent];

    /// Code carried in the kind field of the wire record.
    pub fn code(self) -> u32 {
        match self {
            Self::SshAgent => 0,
            Self::GpgAgent => 1,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Program name, also the name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::SshAgent => "ssh-agent",
            Self::GpgAgent => "gpg-agent",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.name() == s).ok_or_else(|| UnknownAgent(s.into()))
    }
}

/// The agent kind a client asks for.
///
/// `Preferred` leaves the choice to the daemon's configured default, which is
/// what the `ssh` entry point and clients without `--agent` send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindRequest {
    #[default]
    Preferred,
    Explicit(AgentKind),
}

impl KindRequest {
    pub(crate) const PREFERRED_CODE: u32 = u32::MAX;

    pub fn code(self) -> u32 {
        match self {
            Self::Preferred => Self::PREFERRED_CODE,
            Self::Explicit(kind) => kind.code(),
        }
    }

    /// Resolve against the daemon's preferred kind.
    pub fn resolve(self, preferred: AgentKind) -> AgentKind {
        match self {
            Self::Preferred => preferred,
            Self::Explicit(kind) => kind,
        }
    }
}

impl From<Option<AgentKind>> for KindRequest {
    fn from(kind: Option<AgentKind>) -> Self {
        kind.map_or(Self::Preferred, Self::Explicit)
    }
}

#[cfg(test)]
#[path = "kind_tests.rs"]
mod tests;
