// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specs for the envoyd binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod prelude;

mod daemon {
    mod cli;
    mod lifecycle;
}
