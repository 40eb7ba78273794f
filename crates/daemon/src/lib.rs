// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! envoy daemon library
//!
//! Brokers one long-lived ssh-agent or gpg-agent per local user. Clients
//! connect to a Unix socket, ask for an agent kind, and receive the session
//! details of their agent, which is started on first use and restarted after
//! it dies.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod auth;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod registry;

pub use lifecycle::{run, Config, LifecycleError, SocketOrigin};
