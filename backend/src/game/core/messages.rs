use super::city::City;
use super::geo::Coordinate;
use super::player::PlayerView;
use super::scoring::{LeaderboardEntry, RoundResultEntry};
use super::session::SessionSnapshot;
use super::settings::Settings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    // Host commands
    CreateSession {
        #[serde(default)]
        round_time_sec: Option<f64>,
        #[serde(default)]
        free_radius_km: Option<f64>,
        #[serde(default)]
        penalty_km: Option<f64>,
    },
    UpdateSettings {
        session_id: String,
        #[serde(default)]
        round_time_sec: Option<f64>,
        #[serde(default)]
        free_radius_km: Option<f64>,
    },
    StartRound {
        session_id: String,
        #[serde(default)]
        city_name: Option<String>,
        #[serde(default)]
        lat: Option<f64>,
        #[serde(default)]
        lng: Option<f64>,
    },
    StartRandomRound {
        session_id: String,
    },
    EndRound {
        session_id: String,
    },
    NextRound {
        session_id: String,
    },
    ResetGame {
        session_id: String,
    },
    EndGame {
        session_id: String,
    },
    KickPlayer {
        session_id: String,
        player_id: String,
    },
    ReclaimHost {
        session_id: String,
        host_token: String,
    },

    // Player commands
    Join {
        code: String,
        #[serde(default)]
        name: String,
    },
    SubmitGuess {
        session_id: String,
        lat: f64,
        lng: f64,
    },
}

/// Target revealed with a round's results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevealedCity {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionCreated {
        session_id: String,
        code: String,
        settings: Settings,
        host_token: String,
    },
    Joined {
        session_id: String,
        player_id: String,
        name: String,
        code: String,
    },
    LobbyUpdate {
        players: Vec<PlayerView>,
    },
    SettingsUpdated {
        settings: Settings,
    },
    RandomCities {
        cities: Vec<City>,
    },
    RoundStarted {
        round: u32,
        city_name: String,
        deadline_at: u64,
        free_radius_km: f64,
    },
    GuessAccepted {
        raw_km: f64,
        adjusted_km: f64,
        resubmitted: bool,
    },
    RoundResults {
        round: u32,
        city: RevealedCity,
        results: Vec<RoundResultEntry>,
    },
    LobbyReady,
    GameReset {
        players: Vec<PlayerView>,
    },
    GameFinal {
        leaderboard: Vec<LeaderboardEntry>,
    },
    HostDisconnected {
        grace_secs: u64,
    },
    HostReconnected,
    HostReclaimed {
        snapshot: SessionSnapshot,
    },
    HostReclaimFailed {
        message: String,
    },
    PlayerKicked,
    JoinError {
        message: String,
    },
    RoundError {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// The connection is closed after this message is delivered
    pub fn closes_connection(&self) -> bool {
        matches!(self, ServerMessage::PlayerKicked)
    }

    pub fn revealed_city(name: &str, target: Coordinate) -> RevealedCity {
        RevealedCity {
            name: name.to_string(),
            lat: target.lat,
            lng: target.lng,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_create_session_with_defaults() {
        let json = r#"{"type": "create_session"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateSession {
                round_time_sec: None,
                free_radius_km: None,
                penalty_km: None,
            }
        );
    }

    #[test]
    fn deserialize_join() {
        let json = r#"{"type": "join", "code": "123456", "name": "Alice"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                code: "123456".to_string(),
                name: "Alice".to_string()
            }
        );
    }

    #[test]
    fn deserialize_start_round_by_name() {
        let json = r#"{"type": "start_round", "session_id": "s1", "city_name": "Oslo"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::StartRound {
                session_id: "s1".to_string(),
                city_name: Some("Oslo".to_string()),
                lat: None,
                lng: None,
            }
        );
    }

    #[test]
    fn serialize_lobby_ready() {
        let json = serde_json::to_string(&ServerMessage::LobbyReady).unwrap();
        assert_eq!(json, r#"{"type":"lobby_ready"}"#);
    }

    #[test]
    fn serialize_round_started_has_no_target() {
        let msg = ServerMessage::RoundStarted {
            round: 1,
            city_name: "London".to_string(),
            deadline_at: 21_000,
            free_radius_km: 10.0,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"round_started""#));
        assert!(json.contains(r#""city_name":"London""#));
        assert!(!json.contains("lat"));
    }

    #[test]
    fn only_kick_closes_connection() {
        assert!(ServerMessage::PlayerKicked.closes_connection());
        assert!(!ServerMessage::LobbyReady.closes_connection());
    }
}
