pub mod city;
pub mod city_repository;
pub mod error;
pub mod geo;
pub mod messages;
pub mod player;
pub mod random_cities;
pub mod round;
pub mod scoring;
pub mod session;
pub mod settings;

pub use city::{City, Region};
pub use city_repository::CityRepository;
pub use error::{GeocodeError, SessionError, SessionResult};
pub use geo::Coordinate;
