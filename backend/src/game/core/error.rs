use super::session::SessionState;
use thiserror::Error;

/// Why a geocoding lookup failed
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no location found for \"{0}\"")]
    NotFound(String),
    #[error("geocoding service unavailable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoding service returned an unusable response")]
    InvalidResponse,
}

/// Everything a session command can be rejected with. None of these mutate state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("no active game with that code")]
    CodeNotFound,
    #[error("only the host can do that")]
    NotHost,
    #[error("not allowed while the game is {0}")]
    InvalidState(SessionState),
    #[error("game has finished")]
    Finished,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("coordinates out of range")]
    InvalidCoordinate,
    #[error("a city name or coordinates are required")]
    MissingTarget,
    #[error("random city set is exhausted")]
    RandomCitiesExhausted,
    #[error("no cities available for a random game")]
    NoCitiesAvailable,
    #[error("wrong host token")]
    WrongHostToken,
    #[error("host is still connected")]
    HostAlreadyConnected,
    #[error("could not allocate a unique join code")]
    CodeSpaceExhausted,
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

pub type SessionResult<T> = Result<T, SessionError>;
