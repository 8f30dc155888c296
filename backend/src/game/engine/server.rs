use super::active_session::{SharedSession, now_ms};
use super::ids::{IdGenerator, generate_unique};
use super::registry::{CreatedSession, SessionRegistry};
use crate::game::core::geo::round1;
use crate::game::core::messages::ServerMessage;
use crate::game::core::player::Player;
use crate::game::core::random_cities::select_random_cities;
use crate::game::core::round::GuessReceipt;
use crate::game::core::scoring::LeaderboardEntry;
use crate::game::core::session::{RoundStart, RoundSummary, SessionState};
use crate::game::core::settings::{Settings, SettingsRequest};
use crate::game::core::{City, Coordinate, SessionError, SessionResult};
use crate::game::geocode::Geocoder;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const UNKNOWN_LOCATION: &str = "Unknown location";
pub const DEFAULT_HOST_GRACE: Duration = Duration::from_secs(180);
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(300);
const MAX_PLAYER_ID_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    /// How long a disconnected host may take to reclaim the session
    pub host_grace: Duration,
    /// How long FINISHED sessions stay addressable before being reaped
    pub finished_retention: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            host_grace: DEFAULT_HOST_GRACE,
            finished_retention: DEFAULT_FINISHED_RETENTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Host,
    Player { player_id: String },
}

/// Which session a connection is bound to, and as what
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub session_id: String,
    pub role: Role,
}

/// Entry point for every inbound command. Owns the registry, the city pool
/// and the connection -> session bindings.
pub struct GameServer {
    pub registry: SessionRegistry,
    cities: Vec<City>,
    geocoder: Arc<dyn Geocoder>,
    config: GameConfig,
    connections: DashMap<String, Membership>, // connection_id -> membership
}

impl GameServer {
    pub fn new(
        cities: Vec<City>,
        geocoder: Arc<dyn Geocoder>,
        ids: Arc<dyn IdGenerator>,
        config: GameConfig,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(ids),
            cities,
            geocoder,
            config,
            connections: DashMap::new(),
        }
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn membership(&self, connection_id: &str) -> Option<Membership> {
        self.connections.get(connection_id).map(|m| m.clone())
    }

    pub(super) fn bind(&self, connection_id: &str, session_id: &str, role: Role) {
        self.connections.insert(
            connection_id.to_string(),
            Membership {
                session_id: session_id.to_string(),
                role,
            },
        );
    }

    fn session(&self, session_id: &str) -> SessionResult<SharedSession> {
        self.registry.get(session_id).ok_or(SessionError::NotFound)
    }

    pub async fn create_session(
        &self,
        connection_id: &str,
        tx: broadcast::Sender<ServerMessage>,
        req: SettingsRequest,
    ) -> SessionResult<CreatedSession> {
        let settings = Settings::from_request(req);
        let (created, shared) = self.registry.create(settings, connection_id, tx)?;
        self.disconnect(connection_id).await;
        self.bind(connection_id, &created.session_id, Role::Host);

        let active = shared.lock().await;
        active.send_to(
            connection_id,
            ServerMessage::SessionCreated {
                session_id: created.session_id.clone(),
                code: created.code.clone(),
                settings,
                host_token: created.host_token.clone(),
            },
        );
        active.broadcast_roster();
        Ok(created)
    }

    pub async fn update_settings(
        &self,
        connection_id: &str,
        session_id: &str,
        req: SettingsRequest,
    ) -> SessionResult<Settings> {
        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;

        let settings = active.session.update_settings(req)?;
        debug!(session_id, ?settings, "Settings updated");
        active.broadcast(ServerMessage::SettingsUpdated { settings });
        Ok(settings)
    }

    /// Join by code. Returns the new player's id.
    pub async fn join(
        &self,
        connection_id: &str,
        tx: broadcast::Sender<ServerMessage>,
        code: &str,
        name: &str,
    ) -> SessionResult<String> {
        let shared = self
            .registry
            .get_by_code(code)
            .ok_or(SessionError::CodeNotFound)?;

        if shared.lock().await.session.state() == SessionState::Finished {
            return Err(SessionError::CodeNotFound);
        }
        // Leave any previous binding before taking this session's lock
        self.disconnect(connection_id).await;

        let mut active = shared.lock().await;
        if active.session.state() == SessionState::Finished {
            return Err(SessionError::CodeNotFound);
        }

        let player_id = generate_unique(
            || self.registry.ids().player_id(),
            |id| active.session.has_player(id),
            MAX_PLAYER_ID_ATTEMPTS,
        )
        .ok_or(SessionError::CodeSpaceExhausted)?;

        let player = active
            .session
            .add_player(Player::new(player_id.clone(), name, connection_id))?
            .clone();
        active.add_participant(connection_id, tx);

        let session_id = active.session.id.clone();
        self.bind(
            connection_id,
            &session_id,
            Role::Player {
                player_id: player_id.clone(),
            },
        );

        info!(session_id, player_id, name = player.name, "Player joined");

        active.send_to(
            connection_id,
            ServerMessage::Joined {
                session_id,
                player_id: player_id.clone(),
                name: player.name,
                code: active.session.code.clone(),
            },
        );
        active.broadcast_roster();
        Ok(player_id)
    }

    /// Start a round at explicit coordinates, or at a city name resolved
    /// through the geocoder. Coordinates win when both are given.
    pub async fn start_round(
        &self,
        connection_id: &str,
        session_id: &str,
        city_name: Option<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> SessionResult<RoundStart> {
        let shared = self.session(session_id)?;
        shared.lock().await.session.require_host(connection_id)?;

        let city_name = city_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let (target, name) = match (lat, lng, city_name) {
            (Some(lat), Some(lng), name) => (
                Coordinate::new(lat, lng),
                name.unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            ),
            (_, _, Some(name)) => match self.geocoder.geocode(&name).await {
                Ok(target) => (target, name),
                Err(err) => {
                    warn!(session_id, name, %err, "Geocoding failed, round not started");
                    let active = shared.lock().await;
                    if active.session.state() == SessionState::Lobby {
                        active.broadcast_roster();
                    }
                    return Err(err.into());
                }
            },
            _ => return Err(SessionError::MissingTarget),
        };

        // The lookup suspended us: the session may have been removed, or the
        // host may have dropped or been replaced in the meantime.
        if !self.registry.contains(session_id) {
            return Err(SessionError::NotFound);
        }
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;
        active.start_round(target, name)
    }

    /// Start the next round of a random game, drawing the city set on first use
    pub async fn start_random_round(
        &self,
        connection_id: &str,
        session_id: &str,
    ) -> SessionResult<RoundStart> {
        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;

        if !active.session.has_random_cities() {
            let cities = select_random_cities(&self.cities, &mut rand::rng());
            if cities.is_empty() {
                return Err(SessionError::NoCitiesAvailable);
            }
            info!(session_id, count = cities.len(), "Random city set selected");
            active.session.set_random_cities(cities.clone());
            active.broadcast(ServerMessage::RandomCities { cities });
        }

        let city = active.session.next_random_city()?;
        active.start_round(city.coordinate(), city.name)
    }

    pub async fn submit_guess(
        &self,
        connection_id: &str,
        session_id: &str,
        guess: Coordinate,
    ) -> SessionResult<GuessReceipt> {
        let membership = self
            .membership(connection_id)
            .ok_or(SessionError::UnknownPlayer)?;
        let Role::Player { player_id } = membership.role else {
            return Err(SessionError::UnknownPlayer);
        };
        if membership.session_id != session_id {
            return Err(SessionError::NotFound);
        }

        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        let receipt = active.session.submit_guess(&player_id, guess, now_ms())?;

        debug!(session_id, player_id, raw_km = receipt.raw_km, "Guess accepted");

        active.send_to(
            connection_id,
            ServerMessage::GuessAccepted {
                raw_km: round1(receipt.raw_km),
                adjusted_km: round1(receipt.adjusted_km),
                resubmitted: receipt.resubmitted,
            },
        );
        Ok(receipt)
    }

    /// Host-forced end of the active round
    pub async fn end_round(&self, connection_id: &str, session_id: &str) -> SessionResult<RoundSummary> {
        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;
        active.end_round()
    }

    pub async fn next_round(&self, connection_id: &str, session_id: &str) -> SessionResult<()> {
        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;
        active.next_round()
    }

    pub async fn reset_game(&self, connection_id: &str, session_id: &str) -> SessionResult<()> {
        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;
        active.reset()
    }

    pub async fn end_game(
        &self,
        connection_id: &str,
        session_id: &str,
    ) -> SessionResult<Vec<LeaderboardEntry>> {
        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;
        active.finish()
    }

    pub async fn kick_player(
        &self,
        connection_id: &str,
        session_id: &str,
        player_id: &str,
    ) -> SessionResult<()> {
        let shared = self.session(session_id)?;
        let mut active = shared.lock().await;
        active.session.require_host(connection_id)?;

        let player = active
            .session
            .remove_player(player_id)
            .ok_or(SessionError::UnknownPlayer)?;

        self.connections
            .remove_if(&player.connection_id, |_, m| m.session_id == session_id);
        active.send_to(&player.connection_id, ServerMessage::PlayerKicked);
        active.remove_participant(&player.connection_id);

        info!(session_id, player_id, "Player kicked");
        active.broadcast_roster();
        Ok(())
    }

    /// Implicit command when a connection closes or rebinds
    pub async fn disconnect(&self, connection_id: &str) {
        let Some((_, membership)) = self.connections.remove(connection_id) else {
            return;
        };
        let Some(shared) = self.registry.get(&membership.session_id) else {
            return;
        };
        let mut active = shared.lock().await;

        match membership.role {
            Role::Host => self.host_disconnected(&mut active, connection_id),
            Role::Player { player_id } => {
                active.remove_participant(connection_id);
                if active.session.remove_player(&player_id).is_some() {
                    info!(session_id = membership.session_id, player_id, "Player left");
                    active.broadcast_roster();
                }
            }
        }
    }

    /// Periodically remove sessions that have been FINISHED longer than the retention period
    pub fn spawn_reaper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let server: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(server) = server.upgrade() else {
                    return;
                };
                let retention_ms = server.config.finished_retention.as_millis() as u64;
                let reaped = server.registry.reap_finished(retention_ms, now_ms()).await;
                if reaped > 0 {
                    info!(reaped, remaining = server.registry.len(), "Reaped finished sessions");
                }
            }
        })
    }
}
