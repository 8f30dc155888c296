pub mod active_session;
mod host;
pub mod ids;
pub mod registry;
pub mod server;

pub use active_session::{ActiveSession, SharedSession};
pub use ids::{IdGenerator, RandomIds};
pub use registry::{CreatedSession, SessionRegistry};
pub use server::{GameConfig, GameServer, Membership, Role};
