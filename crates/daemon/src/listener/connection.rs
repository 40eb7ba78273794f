// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use envoy_wire::{AgentSession, SessionStatus};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::{ConnectionError, ListenCtx};
use crate::adapters::{AgentLauncher, Identity, Liveness};
use crate::registry::{AgentRecord, Registry};

/// How a connection ended when it did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The peer failed authorization and was closed without a reply.
    Rejected,
    /// The session was written to the peer.
    Served(AgentSession),
    /// The session could not be written; the registry keeps it anyway.
    Undelivered(AgentSession),
}

/// Serve one request: authorize, read the kind, find or start the peer's
/// agent, reply with its session.
pub async fn handle_connection<R, W, L>(
    mut reader: R,
    mut writer: W,
    peer: Identity,
    ctx: &ListenCtx<L>,
    registry: &mut Registry,
) -> Result<Outcome, ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    L: AgentLauncher,
{
    let peer = match ctx.gate.authorize(peer) {
        Ok(peer) => peer,
        Err(e) => {
            warn!(uid = peer.uid, "rejecting connection: {}", e);
            return Ok(Outcome::Rejected);
        }
    };

    let request = envoy_wire::read_request(&mut reader, ctx.ipc_timeout).await?;
    let kind = request.resolve(ctx.preferred_kind);
    debug!(uid = peer.uid, agent = %kind, "received request");

    let record = registry.find_or_create(peer.uid);
    let session = if needs_spawn(record, &ctx.launcher) {
        let session = ctx.launcher.launch(kind, peer).await?;
        match session.status {
            SessionStatus::Failed => warn!(uid = peer.uid, agent = %kind, "agent failed to start"),
            _ => info!(uid = peer.uid, agent = %kind, pid = session.process_id, "agent started"),
        }
        record.session = session.clone();
        record.delivered = false;
        session
    } else {
        if record.session.kind != kind {
            debug!(
                uid = peer.uid,
                running = %record.session.kind,
                requested = %kind,
                "reusing running agent of another kind"
            );
        }
        record.session.status = SessionStatus::Running;
        record.session.first_observation = false;
        AgentSession { first_observation: !record.delivered, ..record.session.clone() }
    };

    match envoy_wire::write_session(&mut writer, &session, ctx.ipc_timeout).await {
        Ok(()) => {
            record.delivered = session.status != SessionStatus::Failed;
            Ok(Outcome::Served(session))
        }
        Err(e) => {
            warn!(uid = peer.uid, error = %e, "failed to deliver session");
            Ok(Outcome::Undelivered(session))
        }
    }
}

/// A record needs a new agent when it never had one or its process is gone.
fn needs_spawn<L: AgentLauncher>(record: &AgentRecord, launcher: &L) -> bool {
    let pid = record.session.process_id;
    if pid <= 0 {
        return true;
    }
    match launcher.probe(pid) {
        Liveness::Alive => false,
        Liveness::Gone => {
            info!(uid = record.owner, pid, agent = %record.session.kind, "agent exited, restarting");
            true
        }
    }
}
