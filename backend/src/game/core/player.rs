use serde::{Deserialize, Serialize};

use super::geo::round1;

pub const DEFAULT_PLAYER_NAME: &str = "Player";
const MAX_NAME_CHARS: usize = 32;

/// One participant in a session
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    /// Sum of scored round distances, km. Never decreases except on reset.
    pub total_km: f64,
    pub connection_id: String,
}

impl Player {
    pub fn new(id: impl Into<String>, name: &str, connection_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: display_name(name),
            total_km: 0.0,
            connection_id: connection_id.into(),
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            name: self.name.clone(),
            total_km: round1(self.total_km),
        }
    }
}

/// Roster entry as sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub total_km: f64,
}

fn display_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_PLAYER_NAME.to_string();
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_gets_default() {
        assert_eq!(Player::new("p1", "", "c1").name, DEFAULT_PLAYER_NAME);
        assert_eq!(Player::new("p1", "   ", "c1").name, DEFAULT_PLAYER_NAME);
    }

    #[test]
    fn name_is_trimmed_and_truncated() {
        assert_eq!(Player::new("p1", "  Alice ", "c1").name, "Alice");
        let long = "x".repeat(100);
        assert_eq!(Player::new("p1", &long, "c1").name.chars().count(), 32);
    }

    #[test]
    fn new_player_starts_at_zero() {
        let player = Player::new("p1", "Alice", "c1");
        assert_eq!(player.total_km, 0.0);
        assert_eq!(player.view().total_km, 0.0);
    }
}
