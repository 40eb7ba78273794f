// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listening socket acquisition.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use listenfd::ListenFd;
use tokio::net::UnixListener;
use tracing::{info, warn};

use super::{Config, LifecycleError, SocketOrigin};

/// Exclusive hold on the lock file beside the socket, written with our pid.
#[derive(Debug)]
pub struct InstanceLock {
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    _file: File,
}

/// Lock file guarding `socket`: `envoy.sock` is guarded by `envoy.lock`.
pub fn lock_path(socket: &Path) -> PathBuf {
    socket.with_extension("lock")
}

/// Take the instance lock for `socket`, or fail if another daemon holds it.
pub fn acquire_lock(socket: &Path) -> Result<InstanceLock, LifecycleError> {
    // Open without truncating so a running daemon's pid survives a failed attempt
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(socket))?;
    file.try_lock_exclusive().map_err(|e| match e.kind() {
        ErrorKind::WouldBlock => LifecycleError::AlreadyRunning(socket.to_path_buf()),
        _ => LifecycleError::LockFailed(e),
    })?;

    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(InstanceLock { _file: file })
}

/// Take the socket from the activator if one was passed, else bind our own.
///
/// A bound socket comes with the instance lock, which must be kept for as
/// long as the daemon serves.
pub fn acquire_listener(
    config: &Config,
) -> Result<(UnixListener, SocketOrigin, Option<InstanceLock>), LifecycleError> {
    let mut fds = ListenFd::from_env();
    match fds.len() {
        0 => {
            let (listener, lock) = bind_socket(&config.socket_path)?;
            Ok((listener, SocketOrigin::Created(config.socket_path.clone()), Some(lock)))
        }
        1 => {
            let listener = fds
                .take_unix_listener(0)
                .map_err(LifecycleError::Activation)?
                .ok_or(LifecycleError::NotUnixListener)?;
            listener.set_nonblocking(true)?;
            Ok((UnixListener::from_std(listener)?, SocketOrigin::Activated, None))
        }
        n => Err(LifecycleError::TooManyDescriptors(n)),
    }
}

/// Lock and bind `path`, replacing a stale socket file left by a dead daemon.
///
/// The lock is taken before the socket file is touched. Once it is held, any
/// file at `path` belongs to a daemon that is gone.
///
/// The socket is world-connectable; the peer credential check decides who
/// gets served.
pub fn bind_socket(path: &Path) -> Result<(UnixListener, InstanceLock), LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let lock = acquire_lock(path)?;

    if path.exists() {
        info!(socket = %path.display(), "removing stale socket");
        std::fs::remove_file(path)?;
    }

    let listener =
        UnixListener::bind(path).map_err(|e| LifecycleError::BindFailed(path.to_path_buf(), e))?;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666)) {
        warn!(socket = %path.display(), error = %e, "failed to relax socket permissions");
    }

    Ok((listener, lock))
}
