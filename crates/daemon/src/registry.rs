// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user agent records.
//!
//! The registry is owned by the listener and only ever borrowed for the
//! duration of a single request. Lookups are linear: the number of records is
//! the number of distinct local users that have connected, which is small.

use envoy_wire::AgentSession;

/// One user's session as tracked by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    /// User id of the peer that owns this record
    pub owner: u32,
    pub session: AgentSession,
    /// Whether a response carrying the current spawn has reached a client
    pub delivered: bool,
}

impl AgentRecord {
    fn new(owner: u32) -> Self {
        Self { owner, session: AgentSession::default(), delivered: false }
    }
}

/// All records, at most one per owner.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<AgentRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `owner`, inserting an empty `Stopped` one if needed.
    pub fn find_or_create(&mut self, owner: u32) -> &mut AgentRecord {
        let index = match self.records.iter().position(|r| r.owner == owner) {
            Some(index) => index,
            None => {
                self.records.push(AgentRecord::new(owner));
                self.records.len() - 1
            }
        };
        &mut self.records[index]
    }

    pub fn get(&self, owner: u32) -> Option<&AgentRecord> {
        self.records.iter().find(|r| r.owner == owner)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
