// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session record protocol shared by `envoyd` and its clients.
//!
//! Wire format: a single little-endian kind code from the client, answered by
//! one fixed-size session record (see [`RECORD_LEN`]).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bounded;
mod kind;
mod session;
mod status;
mod wire;

pub use bounded::{BoundedError, BoundedString, FIELD_CAPACITY};
pub use kind::{AgentKind, KindRequest, UnknownAgent};
pub use session::AgentSession;
pub use status::SessionStatus;
pub use wire::{
    decode_request, decode_session, encode_request, encode_session, read_request, read_session,
    write_request, write_session, ProtocolError, RECORD_LEN, REQUEST_LEN,
};
