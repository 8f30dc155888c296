//! Host continuity: a host that drops keeps its session alive for a grace
//! window and can rebind to a new connection by presenting the host token.

use super::active_session::{ActiveSession, now_ms};
use super::server::{GameServer, Role};
use crate::game::core::messages::ServerMessage;
use crate::game::core::session::{SessionSnapshot, SessionState};
use crate::game::core::{SessionError, SessionResult};
use tokio::sync::broadcast;
use tracing::info;

impl GameServer {
    pub(super) fn host_disconnected(&self, active: &mut ActiveSession, connection_id: &str) {
        active.remove_participant(connection_id);

        if active.session.state() == SessionState::Finished {
            return;
        }
        if !active.session.host_disconnected(connection_id, now_ms()) {
            return;
        }

        let grace = self.config().host_grace;
        info!(
            session_id = active.session.id,
            grace_secs = grace.as_secs(),
            "Host disconnected, waiting for reclaim"
        );

        active.broadcast(ServerMessage::HostDisconnected {
            grace_secs: grace.as_secs(),
        });
        active.arm_grace_timer(grace);
    }

    /// Rebind the host of `session_id` to `connection_id`. On success the
    /// grace timer is cancelled and the new connection receives a snapshot.
    pub async fn reclaim_host(
        &self,
        connection_id: &str,
        tx: broadcast::Sender<ServerMessage>,
        session_id: &str,
        host_token: &str,
    ) -> SessionResult<SessionSnapshot> {
        let shared = self
            .registry
            .get(session_id)
            .ok_or(SessionError::NotFound)?;

        // Validate before touching the caller's current binding
        shared.lock().await.session.check_reclaim(host_token)?;
        self.disconnect(connection_id).await;

        let mut active = shared.lock().await;
        let snapshot = active.session.reclaim_host(host_token, connection_id)?;
        active.cancel_grace_timer();
        active.add_participant(connection_id, tx);
        self.bind(connection_id, session_id, Role::Host);

        info!(session_id, connection_id, "Host reclaimed session");

        active.send_to(
            connection_id,
            ServerMessage::HostReclaimed {
                snapshot: snapshot.clone(),
            },
        );
        active.broadcast_except(connection_id, ServerMessage::HostReconnected);
        Ok(snapshot)
    }
}
