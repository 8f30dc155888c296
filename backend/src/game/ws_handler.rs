use crate::game::core::messages::{ClientMessage, ServerMessage};
use crate::game::core::settings::SettingsRequest;
use crate::game::core::{Coordinate, SessionError};
use crate::game::engine::GameServer;
use crate::game::ws::{ConnectionContext, ConnectionHandler, run_connection};
use axum::extract::ws::WebSocket;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Which rejection event a failed command is reported with
#[derive(Clone, Copy)]
enum Reply {
    Join,
    Round,
    Reclaim,
    General,
}

fn reject(tx: &broadcast::Sender<ServerMessage>, reply: Reply, err: SessionError) {
    debug!(%err, "Command rejected");
    let message = err.to_string();
    let msg = match reply {
        Reply::Join => ServerMessage::JoinError { message },
        Reply::Round => ServerMessage::RoundError { message },
        Reply::Reclaim => ServerMessage::HostReclaimFailed { message },
        Reply::General => ServerMessage::Error { message },
    };
    let _ = tx.send(msg);
}

fn report<T>(tx: &broadcast::Sender<ServerMessage>, reply: Reply, result: Result<T, SessionError>) {
    if let Err(err) = result {
        reject(tx, reply, err);
    }
}

impl ConnectionHandler for GameServer {
    async fn handle_message(
        self: Arc<Self>,
        msg: ClientMessage,
        tx: broadcast::Sender<ServerMessage>,
        ctx: &mut ConnectionContext,
    ) {
        let conn = ctx.connection_id.as_str();

        match msg {
            ClientMessage::CreateSession {
                round_time_sec,
                free_radius_km,
                penalty_km,
            } => {
                let req = SettingsRequest {
                    round_time_sec,
                    free_radius_km,
                    penalty_km,
                };
                let result = self.create_session(conn, tx.clone(), req).await;
                report(&tx, Reply::General, result);
            }
            ClientMessage::UpdateSettings {
                session_id,
                round_time_sec,
                free_radius_km,
            } => {
                let req = SettingsRequest {
                    round_time_sec,
                    free_radius_km,
                    penalty_km: None,
                };
                let result = self.update_settings(conn, &session_id, req).await;
                report(&tx, Reply::General, result);
            }
            ClientMessage::Join { code, name } => {
                let result = self.join(conn, tx.clone(), &code, &name).await;
                report(&tx, Reply::Join, result);
            }
            ClientMessage::StartRound {
                session_id,
                city_name,
                lat,
                lng,
            } => {
                let result = self.start_round(conn, &session_id, city_name, lat, lng).await;
                report(&tx, Reply::Round, result);
            }
            ClientMessage::StartRandomRound { session_id } => {
                let result = self.start_random_round(conn, &session_id).await;
                report(&tx, Reply::Round, result);
            }
            ClientMessage::SubmitGuess {
                session_id,
                lat,
                lng,
            } => {
                let result = self
                    .submit_guess(conn, &session_id, Coordinate::new(lat, lng))
                    .await;
                report(&tx, Reply::General, result);
            }
            ClientMessage::EndRound { session_id } => {
                let result = self.end_round(conn, &session_id).await;
                report(&tx, Reply::Round, result);
            }
            ClientMessage::NextRound { session_id } => {
                let result = self.next_round(conn, &session_id).await;
                report(&tx, Reply::General, result);
            }
            ClientMessage::ResetGame { session_id } => {
                let result = self.reset_game(conn, &session_id).await;
                report(&tx, Reply::General, result);
            }
            ClientMessage::EndGame { session_id } => {
                let result = self.end_game(conn, &session_id).await;
                report(&tx, Reply::General, result);
            }
            ClientMessage::KickPlayer {
                session_id,
                player_id,
            } => {
                let result = self.kick_player(conn, &session_id, &player_id).await;
                report(&tx, Reply::General, result);
            }
            ClientMessage::ReclaimHost {
                session_id,
                host_token,
            } => {
                let result = self
                    .reclaim_host(conn, tx.clone(), &session_id, &host_token)
                    .await;
                if let Err(err) = &result {
                    warn!(session_id, %err, "Host reclaim rejected");
                }
                report(&tx, Reply::Reclaim, result);
            }
        }
    }

    async fn handle_disconnect(self: Arc<Self>, connection_id: String) {
        self.disconnect(&connection_id).await;
    }

    fn name(&self) -> &'static str {
        "game"
    }
}

pub async fn handle_connection(socket: WebSocket, state: Arc<GameServer>) {
    run_connection(socket, state).await;
}
