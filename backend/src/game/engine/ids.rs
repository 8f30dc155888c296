use rand::Rng;

const PLAYER_ID_CHARSET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
const PLAYER_ID_LENGTH: usize = 6;

/// Source of every identifier the server hands out.
/// Swappable so tests can force collisions or fixed values.
pub trait IdGenerator: Send + Sync + 'static {
    fn session_id(&self) -> String;
    /// Six numeric digits
    fn join_code(&self) -> String;
    fn host_token(&self) -> String;
    fn player_id(&self) -> String;
}

/// Random identifiers: UUIDs for ids and tokens, 100000-999999 for join codes
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn session_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn join_code(&self) -> String {
        rand::rng().random_range(100_000..=999_999u32).to_string()
    }

    fn host_token(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn player_id(&self) -> String {
        let mut rng = rand::rng();
        let suffix: String = (0..PLAYER_ID_LENGTH)
            .map(|_| PLAYER_ID_CHARSET[rng.random_range(0..PLAYER_ID_CHARSET.len())] as char)
            .collect();
        format!("p-{suffix}")
    }
}

/// Generate ids until one is not taken, giving up after `max_attempts`
pub fn generate_unique<G, F>(generate: G, exists: F, max_attempts: usize) -> Option<String>
where
    G: Fn() -> String,
    F: Fn(&str) -> bool,
{
    (0..max_attempts)
        .map(|_| generate())
        .find(|id| !exists(id.as_str()))
}
