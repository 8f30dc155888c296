use crate::game::core::messages::ServerMessage;
use crate::game::core::scoring::LeaderboardEntry;
use crate::game::core::session::{GameSession, RoundStart, RoundSummary, SessionState};
use crate::game::core::{Coordinate, SessionResult};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One lock per session, so unrelated sessions never contend
pub type SharedSession = Arc<Mutex<ActiveSession>>;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// An active session: pure game logic plus transport channels and timers
pub struct ActiveSession {
    pub session: GameSession,
    this: Weak<Mutex<ActiveSession>>,
    participants: HashMap<String, broadcast::Sender<ServerMessage>>,
    round_timer: Option<JoinHandle<()>>,
    grace_timer: Option<JoinHandle<()>>,
}

impl ActiveSession {
    pub fn new_shared(
        session: GameSession,
        host_connection: &str,
        host_tx: broadcast::Sender<ServerMessage>,
    ) -> SharedSession {
        let mut participants = HashMap::new();
        participants.insert(host_connection.to_string(), host_tx);

        Arc::new_cyclic(|this| {
            Mutex::new(Self {
                session,
                this: this.clone(),
                participants,
                round_timer: None,
                grace_timer: None,
            })
        })
    }

    // ---- transport ----

    pub fn add_participant(&mut self, connection_id: &str, tx: broadcast::Sender<ServerMessage>) {
        self.participants.insert(connection_id.to_string(), tx);
    }

    pub fn remove_participant(&mut self, connection_id: &str) -> Option<broadcast::Sender<ServerMessage>> {
        self.participants.remove(connection_id)
    }

    pub fn send_to(&self, connection_id: &str, msg: ServerMessage) {
        if let Some(tx) = self.participants.get(connection_id) {
            let _ = tx.send(msg);
        }
    }

    pub fn broadcast(&self, msg: ServerMessage) {
        debug!(session_id = self.session.id, ?msg, "Broadcasting to session");
        for tx in self.participants.values() {
            let _ = tx.send(msg.clone());
        }
    }

    pub fn broadcast_except(&self, connection_id: &str, msg: ServerMessage) {
        for (id, tx) in &self.participants {
            if id != connection_id {
                let _ = tx.send(msg.clone());
            }
        }
    }

    pub fn broadcast_roster(&self) {
        self.broadcast(ServerMessage::LobbyUpdate {
            players: self.session.roster(),
        });
    }

    // ---- timers ----

    pub fn has_round_timer(&self) -> bool {
        self.round_timer.is_some()
    }

    pub fn has_grace_timer(&self) -> bool {
        self.grace_timer.is_some()
    }

    pub fn cancel_round_timer(&mut self) {
        if let Some(handle) = self.round_timer.take() {
            handle.abort();
        }
    }

    pub fn cancel_grace_timer(&mut self) {
        if let Some(handle) = self.grace_timer.take() {
            handle.abort();
        }
    }

    pub fn cancel_timers(&mut self) {
        self.cancel_round_timer();
        self.cancel_grace_timer();
    }

    fn arm_round_timer(&mut self, timeout: Duration, round_number: u32) {
        self.cancel_round_timer();
        let this = self.this.clone();
        self.round_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(shared) = this.upgrade() else {
                return;
            };
            let mut active = shared.lock().await;
            active.handle_round_deadline(round_number);
        }));
    }

    /// Arm the host grace timer; when it fires without a reclaim, the game ends
    pub fn arm_grace_timer(&mut self, grace: Duration) {
        self.cancel_grace_timer();
        let this = self.this.clone();
        self.grace_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let Some(shared) = this.upgrade() else {
                return;
            };
            let mut active = shared.lock().await;
            active.handle_grace_expired();
        }));
    }

    fn handle_round_deadline(&mut self, round_number: u32) {
        // The handle belongs to this very task; drop it without aborting
        self.round_timer = None;

        if self.session.state() != SessionState::InRound || self.session.round() != round_number {
            return;
        }
        info!(session_id = self.session.id, round_number, "Round deadline reached");
        let _ = self.end_round();
    }

    fn handle_grace_expired(&mut self) {
        self.grace_timer = None;

        if self.session.host_connection().is_some() {
            return;
        }
        info!(session_id = self.session.id, "Host grace period lapsed");
        let _ = self.finish();
    }

    // ---- transitions with side effects ----

    pub fn start_round(&mut self, target: Coordinate, city_name: String) -> SessionResult<RoundStart> {
        let start = self.session.start_round(target, city_name, now_ms())?;
        self.arm_round_timer(self.session.settings().round_duration(), start.round);

        info!(
            session_id = self.session.id,
            round = start.round,
            city = start.city_name,
            "Round started"
        );

        self.broadcast(ServerMessage::RoundStarted {
            round: start.round,
            city_name: start.city_name.clone(),
            deadline_at: start.deadline_at_ms,
            free_radius_km: start.free_radius_km,
        });
        Ok(start)
    }

    pub fn end_round(&mut self) -> SessionResult<RoundSummary> {
        let summary = self.session.end_round()?;
        self.cancel_round_timer();

        info!(session_id = self.session.id, round = summary.round, "Round scored");

        self.broadcast(ServerMessage::RoundResults {
            round: summary.round,
            city: ServerMessage::revealed_city(&summary.city_name, summary.target),
            results: summary.results.clone(),
        });
        Ok(summary)
    }

    pub fn next_round(&mut self) -> SessionResult<()> {
        self.session.next_round()?;
        self.cancel_round_timer();
        self.broadcast(ServerMessage::LobbyReady);
        Ok(())
    }

    pub fn reset(&mut self) -> SessionResult<()> {
        self.session.reset()?;
        self.cancel_round_timer();
        info!(session_id = self.session.id, "Game reset");
        self.broadcast(ServerMessage::GameReset {
            players: self.session.roster(),
        });
        Ok(())
    }

    pub fn finish(&mut self) -> SessionResult<Vec<LeaderboardEntry>> {
        let leaderboard = self.session.finish(now_ms())?;
        self.cancel_timers();
        info!(session_id = self.session.id, players = leaderboard.len(), "Game finished");
        self.broadcast(ServerMessage::GameFinal {
            leaderboard: leaderboard.clone(),
        });
        Ok(leaderboard)
    }
}
