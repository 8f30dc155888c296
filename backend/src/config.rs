use geoquiz::game::GameConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub geocoder_url: String,
    pub geocoder_timeout: Duration,
    pub host_grace: Duration,
    pub finished_retention: Duration,
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: var_or("PORT", 3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:geoquiz.db?mode=rwc".to_string()),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            geocoder_timeout: Duration::from_secs(var_or("GEOCODER_TIMEOUT_SECS", 5)),
            host_grace: Duration::from_secs(var_or("HOST_GRACE_SECS", 180)),
            finished_retention: Duration::from_secs(var_or("FINISHED_RETENTION_SECS", 300)),
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            host_grace: self.host_grace,
            finished_retention: self.finished_retention,
        }
    }
}
