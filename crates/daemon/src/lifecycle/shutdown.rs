// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tracing::{info, warn};

use super::{lock_path, SocketOrigin};
use crate::adapters::AgentLauncher;
use crate::registry::Registry;

/// Release the socket and terminate tracked agents.
///
/// An inherited socket belongs to the activator, and so do the agents started
/// through it: both are left alone. Otherwise the socket file is removed and
/// every record with a positive pid is sent SIGTERM exactly once. The lock
/// file goes with the socket. Returns the number of agents signalled.
pub fn shutdown<L: AgentLauncher + ?Sized>(
    registry: &Registry,
    origin: &SocketOrigin,
    launcher: &L,
) -> usize {
    let path = match origin {
        SocketOrigin::Activated => {
            info!(agents = registry.len(), "socket was inherited, leaving agents running");
            return 0;
        }
        SocketOrigin::Created(path) => path,
    };

    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove socket file: {}", e);
        }
    }
    // The lock itself is released when the daemon drops its handle
    let lock = lock_path(path);
    if lock.exists() {
        if let Err(e) = std::fs::remove_file(&lock) {
            warn!("Failed to remove lock file: {}", e);
        }
    }

    let mut signalled = 0;
    for record in registry.iter() {
        let pid = record.session.process_id;
        if pid <= 0 {
            continue;
        }
        match launcher.terminate(pid) {
            Ok(()) => info!(uid = record.owner, pid, "terminated agent"),
            Err(e) => warn!(uid = record.owner, pid, error = %e, "failed to terminate agent"),
        }
        signalled += 1;
    }

    info!(signalled, "daemon shutdown complete");
    signalled
}
