// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finding the program `envoy-exec` stands in for.
//!
//! `envoy-exec` can be reached three ways: by name with a command to run, as
//! a symlink named after the command it wraps, or as the interpreter of a
//! script whose body names the command. In the last two cases the obvious
//! `PATH` lookup finds the wrapper itself, so that file is skipped.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Name `envoy-exec` answers to when it parses its own options.
pub const EXEC_NAME: &str = "envoy-exec";

/// Longest script prefix inspected for a command line.
const MAX_SCRIPT: u64 = 64 * 1024;

/// What to run, and which file must not be run in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub command: String,
    pub skip: PathBuf,
}

impl Target {
    /// The target for an argv whose first element is `argv0`.
    ///
    /// A script's command comes from its body and the script itself is
    /// skipped; anything else runs `argv0` while skipping `self_exe`.
    pub fn resolve(argv0: &str, self_exe: &Path) -> Self {
        match read_script(Path::new(argv0)) {
            Some(command) => Self { command, skip: PathBuf::from(argv0) },
            None => Self { command: argv0.to_string(), skip: self_exe.to_path_buf() },
        }
    }

    /// Executables to try in order: an explicit path first, then every match
    /// in `path_var`.
    pub fn candidates(&self, path_var: Option<&OsStr>) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut name = self.command.as_str();

        if self.command.starts_with('/') || self.command.starts_with('.') {
            let direct = PathBuf::from(&self.command);
            if !resolves_to(&direct, &self.skip) {
                found.push(direct);
            }
            // Reached by full path: fall back to looking up the bare name
            name = Path::new(&self.command).file_name().and_then(OsStr::to_str).unwrap_or(name);
        }

        if let Some(path_var) = path_var {
            found.extend(path_candidates(name, path_var, &self.skip));
        }
        found
    }
}

/// Base name of argv[0].
pub fn invoked_name(argv0: Option<&OsString>) -> String {
    argv0
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| EXEC_NAME.to_string())
}

/// Executables named `name` in each directory of `path_var`, skipping any
/// that resolve to `skip`.
pub fn path_candidates(name: &str, path_var: &OsStr, skip: &Path) -> Vec<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .filter(|candidate| is_executable(candidate))
        .filter(|candidate| !resolves_to(candidate, skip))
        .collect()
}

/// Command named by a script that uses `envoy-exec` as its interpreter.
///
/// The first non-blank line after the shebang, once leading `#`, tab and
/// space characters are stripped, names the command up to any further `#`.
pub fn script_command(text: &str) -> Option<String> {
    let mut lines = text.lines();
    if !lines.next()?.starts_with("#!") {
        return None;
    }
    for line in lines {
        let line = line.trim_start_matches(['#', '\t', ' ']);
        if line.trim().is_empty() {
            continue;
        }
        let command = line.split('#').next().unwrap_or_default().trim();
        return (!command.is_empty()).then(|| command.to_string());
    }
    None
}

fn read_script(path: &Path) -> Option<String> {
    let file = std::fs::File::open(path).ok()?;
    if !file.metadata().ok()?.is_file() {
        return None;
    }
    let mut buf = Vec::new();
    file.take(MAX_SCRIPT).read_to_end(&mut buf).ok()?;
    if !buf.starts_with(b"#!") {
        return None;
    }
    script_command(&String::from_utf8_lossy(&buf))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn resolves_to(candidate: &Path, target: &Path) -> bool {
    match (std::fs::canonicalize(candidate), std::fs::canonicalize(target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
