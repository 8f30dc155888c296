use super::city::City;
use super::error::{SessionError, SessionResult};
use super::geo::Coordinate;
use super::player::{Player, PlayerView};
use super::round::{GuessReceipt, Round};
use super::scoring::{self, LeaderboardEntry, RoundResultEntry};
use super::settings::{Settings, SettingsRequest};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Lobby,
    InRound,
    ShowingResults,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Lobby => "in the lobby",
            SessionState::InRound => "in a round",
            SessionState::ShowingResults => "showing results",
            SessionState::Finished => "finished",
        })
    }
}

/// Round data broadcast when a round starts. The target stays server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundStart {
    pub round: u32,
    pub city_name: String,
    pub deadline_at_ms: u64,
    pub free_radius_km: f64,
}

/// A scored round, revealed to everyone
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub round: u32,
    pub city_name: String,
    pub target: Coordinate,
    pub results: Vec<RoundResultEntry>,
}

/// Round info that is safe to hand to a reconnecting host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRoundView {
    pub round: u32,
    pub city_name: String,
    pub deadline_at: u64,
}

/// Full state handed to a host after a successful reclaim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub code: String,
    pub state: SessionState,
    pub round: u32,
    pub settings: Settings,
    pub players: Vec<PlayerView>,
    pub active_round: Option<ActiveRoundView>,
}

/// One game instance (pure logic, no I/O or timers)
pub struct GameSession {
    pub id: String,
    pub code: String,
    host_token: String,
    settings: Settings,
    state: SessionState,
    round: u32,
    host_connection: Option<String>,
    host_disconnected_at_ms: Option<u64>,
    players: Vec<Player>,
    current_round: Option<Round>,
    random_cities: Option<Vec<City>>,
    random_cursor: usize,
    finished_at_ms: Option<u64>,
}

impl GameSession {
    pub fn new(
        id: impl Into<String>,
        code: impl Into<String>,
        host_token: impl Into<String>,
        settings: Settings,
        host_connection: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            host_token: host_token.into(),
            settings,
            state: SessionState::Lobby,
            round: 0,
            host_connection: Some(host_connection.into()),
            host_disconnected_at_ms: None,
            players: Vec::new(),
            current_round: None,
            random_cities: None,
            random_cursor: 0,
            finished_at_ms: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn host_token(&self) -> &str {
        &self.host_token
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.current_round.as_ref()
    }

    pub fn random_cities(&self) -> Option<&[City]> {
        self.random_cities.as_deref()
    }

    pub fn finished_at_ms(&self) -> Option<u64> {
        self.finished_at_ms
    }

    pub fn roster(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    // ---- host identity ----

    pub fn host_connection(&self) -> Option<&str> {
        self.host_connection.as_deref()
    }

    pub fn host_disconnected_at_ms(&self) -> Option<u64> {
        self.host_disconnected_at_ms
    }

    pub fn is_host(&self, connection_id: &str) -> bool {
        self.host_connection.as_deref() == Some(connection_id)
    }

    /// Host-only commands require the bound host connection and a live session
    pub fn require_host(&self, connection_id: &str) -> SessionResult<()> {
        if !self.is_host(connection_id) {
            return Err(SessionError::NotHost);
        }
        if self.state == SessionState::Finished {
            return Err(SessionError::Finished);
        }
        Ok(())
    }

    /// Returns false if `connection_id` was not the host
    pub fn host_disconnected(&mut self, connection_id: &str, now_ms: u64) -> bool {
        if !self.is_host(connection_id) {
            return false;
        }
        self.host_connection = None;
        self.host_disconnected_at_ms = Some(now_ms);
        true
    }

    /// A reclaim with `token` would succeed right now
    pub fn check_reclaim(&self, token: &str) -> SessionResult<()> {
        if self.state == SessionState::Finished {
            return Err(SessionError::Finished);
        }
        if token != self.host_token {
            return Err(SessionError::WrongHostToken);
        }
        if self.host_connection.is_some() {
            return Err(SessionError::HostAlreadyConnected);
        }
        Ok(())
    }

    /// Rebind the host to a new connection if the token matches and no host is bound
    pub fn reclaim_host(&mut self, token: &str, connection_id: &str) -> SessionResult<SessionSnapshot> {
        self.check_reclaim(token)?;
        self.host_connection = Some(connection_id.to_string());
        self.host_disconnected_at_ms = None;
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let active_round = match self.state {
            SessionState::InRound => self.current_round.as_ref().map(|r| ActiveRoundView {
                round: r.number,
                city_name: r.city_name.clone(),
                deadline_at: r.deadline_at_ms,
            }),
            _ => None,
        };

        SessionSnapshot {
            session_id: self.id.clone(),
            code: self.code.clone(),
            state: self.state,
            round: self.round,
            settings: self.settings,
            players: self.roster(),
            active_round,
        }
    }

    // ---- roster ----

    pub fn update_settings(&mut self, req: SettingsRequest) -> SessionResult<Settings> {
        if self.state != SessionState::Lobby {
            return Err(SessionError::InvalidState(self.state));
        }
        self.settings.apply(req);
        Ok(self.settings)
    }

    /// Late joiners are allowed in every state but FINISHED
    pub fn add_player(&mut self, player: Player) -> SessionResult<&Player> {
        if self.state == SessionState::Finished {
            return Err(SessionError::CodeNotFound);
        }
        self.players.push(player);
        Ok(&self.players[self.players.len() - 1])
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.id == player_id)?;
        Some(self.players.remove(idx))
    }

    // ---- rounds ----

    /// Begin a new round. Any round in progress is superseded unscored.
    pub fn start_round(
        &mut self,
        target: Coordinate,
        city_name: String,
        now_ms: u64,
    ) -> SessionResult<RoundStart> {
        if self.state == SessionState::Finished {
            return Err(SessionError::Finished);
        }
        if !target.is_valid() {
            return Err(SessionError::InvalidCoordinate);
        }

        self.round += 1;
        let duration_ms = self.settings.round_time_sec * 1000;
        let round = Round::new(self.round, target, city_name, now_ms, duration_ms);

        let start = RoundStart {
            round: round.number,
            city_name: round.city_name.clone(),
            deadline_at_ms: round.deadline_at_ms,
            free_radius_km: self.settings.free_radius_km,
        };

        self.current_round = Some(round);
        self.state = SessionState::InRound;
        Ok(start)
    }

    pub fn submit_guess(
        &mut self,
        player_id: &str,
        coordinate: Coordinate,
        now_ms: u64,
    ) -> SessionResult<GuessReceipt> {
        if self.state != SessionState::InRound {
            return Err(SessionError::InvalidState(self.state));
        }
        if !self.has_player(player_id) {
            return Err(SessionError::UnknownPlayer);
        }
        if !coordinate.is_valid() {
            return Err(SessionError::InvalidCoordinate);
        }
        let free_radius_km = self.settings.free_radius_km;
        let round = self
            .current_round
            .as_mut()
            .ok_or(SessionError::InvalidState(SessionState::InRound))?;

        Ok(round.record_guess(player_id, coordinate, free_radius_km, now_ms))
    }

    /// Score the active round. Results stay attached until the next transition.
    pub fn end_round(&mut self) -> SessionResult<RoundSummary> {
        if self.state != SessionState::InRound {
            return Err(SessionError::InvalidState(self.state));
        }
        let round = self
            .current_round
            .as_ref()
            .ok_or(SessionError::InvalidState(self.state))?;

        let results = scoring::score_round(&mut self.players, round, self.settings.penalty_km);
        let summary = RoundSummary {
            round: round.number,
            city_name: round.city_name.clone(),
            target: round.target,
            results,
        };

        self.state = SessionState::ShowingResults;
        Ok(summary)
    }

    pub fn next_round(&mut self) -> SessionResult<()> {
        match self.state {
            SessionState::ShowingResults | SessionState::InRound => {
                self.current_round = None;
                self.state = SessionState::Lobby;
                Ok(())
            }
            state => Err(SessionError::InvalidState(state)),
        }
    }

    pub fn reset(&mut self) -> SessionResult<()> {
        if self.state == SessionState::Finished {
            return Err(SessionError::Finished);
        }
        self.round = 0;
        self.current_round = None;
        self.random_cities = None;
        self.random_cursor = 0;
        for player in &mut self.players {
            player.total_km = 0.0;
        }
        self.state = SessionState::Lobby;
        Ok(())
    }

    /// Terminal transition. Returns the final leaderboard.
    pub fn finish(&mut self, now_ms: u64) -> SessionResult<Vec<LeaderboardEntry>> {
        if self.state == SessionState::Finished {
            return Err(SessionError::Finished);
        }
        self.state = SessionState::Finished;
        self.finished_at_ms = Some(now_ms);
        Ok(scoring::leaderboard(&self.players))
    }

    // ---- random mode ----

    /// True when a city set has already been drawn for this game
    pub fn has_random_cities(&self) -> bool {
        self.random_cities.is_some()
    }

    pub fn set_random_cities(&mut self, cities: Vec<City>) {
        self.random_cities = Some(cities);
        self.random_cursor = 0;
    }

    /// Next unused candidate of the random set, advancing the cursor
    pub fn next_random_city(&mut self) -> SessionResult<City> {
        let cities = self
            .random_cities
            .as_ref()
            .ok_or(SessionError::NoCitiesAvailable)?;
        let city = cities
            .get(self.random_cursor)
            .cloned()
            .ok_or(SessionError::RandomCitiesExhausted)?;
        self.random_cursor += 1;
        Ok(city)
    }
}
