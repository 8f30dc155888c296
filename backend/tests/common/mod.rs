#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use geoquiz::game::core::{Coordinate, GeocodeError};
use geoquiz::game::{GameConfig, Geocoder};
use geoquiz::messages::{ClientMessage, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves a handful of well-known names, fails for everything else
pub struct FixedGeocoder;

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, name: &str) -> Result<Coordinate, GeocodeError> {
        match name.to_lowercase().as_str() {
            "london" => Ok(Coordinate::new(51.5074, -0.1278)),
            "stockholm" => Ok(Coordinate::new(59.3293, 18.0686)),
            _ => Err(GeocodeError::NotFound(name.to_string())),
        }
    }
}

/// Holds every lookup until released. `started` fires once a lookup is pending.
#[derive(Clone, Default)]
pub struct GatedGeocoder {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait]
impl Geocoder for GatedGeocoder {
    async fn geocode(&self, name: &str) -> Result<Coordinate, GeocodeError> {
        self.started.notify_one();
        self.release.notified().await;
        FixedGeocoder.geocode(name).await
    }
}

pub struct TestServer {
    base_url: String,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("{}/ws", self.base_url)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!(
            "http://{}{}",
            self.base_url.strip_prefix("ws://").unwrap(),
            path
        )
    }
}

pub async fn spawn_test_server() -> TestServer {
    spawn_test_server_with_config(GameConfig::default()).await
}

pub async fn spawn_test_server_with_config(config: GameConfig) -> TestServer {
    let pool = sqlx::SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();

    let server = geoquiz::build_server(pool, Arc::new(FixedGeocoder), config)
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, geoquiz::app(server)).await.unwrap();
    });

    TestServer {
        base_url: format!("ws://{}", addr),
    }
}

pub async fn connect(server: &TestServer) -> WsStream {
    let (ws, _) = connect_async(&server.ws_url()).await.expect("Failed to connect");
    ws
}

pub fn msg(client_msg: &ClientMessage) -> Message {
    let json = serde_json::to_string(client_msg).unwrap();
    Message::Text(json.into())
}

pub fn create_session_msg() -> Message {
    msg(&ClientMessage::CreateSession {
        round_time_sec: None,
        free_radius_km: None,
        penalty_km: None,
    })
}

pub fn join_msg(code: &str, name: &str) -> Message {
    msg(&ClientMessage::Join {
        code: code.to_string(),
        name: name.to_string(),
    })
}

pub fn start_round_at(session_id: &str, city_name: &str, lat: f64, lng: f64) -> Message {
    msg(&ClientMessage::StartRound {
        session_id: session_id.to_string(),
        city_name: Some(city_name.to_string()),
        lat: Some(lat),
        lng: Some(lng),
    })
}

pub fn start_round_named(session_id: &str, city_name: &str) -> Message {
    msg(&ClientMessage::StartRound {
        session_id: session_id.to_string(),
        city_name: Some(city_name.to_string()),
        lat: None,
        lng: None,
    })
}

pub fn guess_msg(session_id: &str, lat: f64, lng: f64) -> Message {
    msg(&ClientMessage::SubmitGuess {
        session_id: session_id.to_string(),
        lat,
        lng,
    })
}

pub fn end_round_msg(session_id: &str) -> Message {
    msg(&ClientMessage::EndRound {
        session_id: session_id.to_string(),
    })
}

pub async fn recv(ws: &mut WsStream) -> ServerMessage {
    let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
        .await
        .expect("Timed out waiting for server message")
        .unwrap()
        .unwrap();
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

/// Host connection with a fresh session. Returns (ws, session_id, code, host_token).
pub async fn create_session(server: &TestServer) -> (WsStream, String, String, String) {
    let mut host = connect(server).await;
    host.send(create_session_msg()).await.unwrap();

    let ServerMessage::SessionCreated {
        session_id,
        code,
        host_token,
        ..
    } = recv(&mut host).await
    else {
        panic!("Expected SessionCreated");
    };
    assert_eq!(
        recv(&mut host).await,
        ServerMessage::LobbyUpdate { players: vec![] }
    );

    (host, session_id, code, host_token)
}

/// Join as a player and drain the resulting lobby updates on both sides.
/// Returns (ws, player_id).
pub async fn join_player(
    server: &TestServer,
    host: &mut WsStream,
    code: &str,
    name: &str,
) -> (WsStream, String) {
    let mut player = connect(server).await;
    player.send(join_msg(code, name)).await.unwrap();

    let ServerMessage::Joined { player_id, .. } = recv(&mut player).await else {
        panic!("Expected Joined");
    };
    assert!(matches!(recv(&mut player).await, ServerMessage::LobbyUpdate { .. }));
    assert!(matches!(recv(host).await, ServerMessage::LobbyUpdate { .. }));

    (player, player_id)
}
