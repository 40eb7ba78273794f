// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Lifecycle state reported for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No agent has been started for this record
    #[default]
    Stopped,
    /// The agent was launched while serving this request
    Started,
    /// An existing agent is still alive
    Running,
    /// The agent exited nonzero or was killed during startup
    Failed,
    /// The peer may not use this daemon. Only ever a response value.
    UnauthorizedUser,
}

impl SessionStatus {
    const ALL: [SessionStatus; 5] = [
        SessionStatus::Stopped,
        SessionStatus::Started,
        SessionStatus::Running,
        SessionStatus::Failed,
        SessionStatus::UnauthorizedUser,
    ];

    pub fn code(self) -> u32 {
        match self {
            Self::Stopped => 0,
            Self::Started => 1,
            Self::Running => 2,
            Self::Failed => 3,
            Self::UnauthorizedUser => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Started => write!(f, "started"),
            Self::Running => write!(f, "running"),
            Self::Failed => write!(f, "failed"),
            Self::UnauthorizedUser => write!(f, "unauthorized"),
        }
    }
}
