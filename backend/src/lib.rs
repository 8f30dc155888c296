pub mod game;

pub use game::messages;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade, ws::WebSocket},
    response::Response,
    routing::get,
};
use game::core::CityRepository;
use game::engine::RandomIds;
use game::{GameConfig, GameServer, Geocoder};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

const REAP_INTERVAL: Duration = Duration::from_secs(30);

async fn health() -> &'static str {
    "ok"
}

#[derive(Clone)]
pub struct AppState {
    pub game: Arc<GameServer>,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    game::handle_connection(socket, state.game).await;
}

/// Load the city pool and build the game server, with the finished-session
/// reaper running in the background.
pub async fn build_server(
    pool: SqlitePool,
    geocoder: Arc<dyn Geocoder>,
    config: GameConfig,
) -> Result<Arc<GameServer>, sqlx::Error> {
    let cities = CityRepository::new(pool).load_all().await?;
    info!(cities = cities.len(), "City pool loaded");

    let server = Arc::new(GameServer::new(
        cities,
        geocoder,
        Arc::new(RandomIds),
        config,
    ));
    server.spawn_reaper(REAP_INTERVAL);
    Ok(server)
}

pub fn app(server: Arc<GameServer>) -> Router {
    let state = AppState { game: server };

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::core::{Coordinate, GeocodeError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct NoGeocoder;

    #[async_trait]
    impl Geocoder for NoGeocoder {
        async fn geocode(&self, name: &str) -> Result<Coordinate, GeocodeError> {
            Err(GeocodeError::NotFound(name.to_string()))
        }
    }

    fn test_app() -> Router {
        let server = GameServer::new(
            Vec::new(),
            Arc::new(NoGeocoder),
            Arc::new(RandomIds),
            GameConfig::default(),
        );
        app(Arc::new(server))
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn ws_route_requires_upgrade() {
        let response = test_app()
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
