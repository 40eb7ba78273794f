// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of envoy: fetch the caller's agent session from envoyd and
//! put it to use.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod actions;
pub mod client;
pub mod environ;
pub mod exec;
pub mod exit_error;
pub mod gpg;

pub use client::ClientError;
pub use exit_error::ExitError;
