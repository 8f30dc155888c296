pub mod core;
pub mod engine;
pub mod geocode;
mod ws;
mod ws_handler;

pub use core::messages;
pub use engine::{GameConfig, GameServer};
pub use geocode::{Geocoder, NominatimGeocoder};
pub use ws_handler::handle_connection;
