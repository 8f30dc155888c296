use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

pub const ROUND_TIME_RANGE: RangeInclusive<u64> = 10..=60;
pub const FREE_RADIUS_RANGE: RangeInclusive<f64> = 0.0..=25.0;

pub const DEFAULT_ROUND_TIME_SEC: u64 = 20;
pub const DEFAULT_FREE_RADIUS_KM: f64 = 0.0;
pub const DEFAULT_PENALTY_KM: f64 = 20_000.0;

/// Per-session game settings. Always within their allowed ranges once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub round_time_sec: u64,
    pub free_radius_km: f64,
    pub penalty_km: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            round_time_sec: DEFAULT_ROUND_TIME_SEC,
            free_radius_km: DEFAULT_FREE_RADIUS_KM,
            penalty_km: DEFAULT_PENALTY_KM,
        }
    }
}

/// Raw, possibly out-of-range settings as requested by a host
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsRequest {
    pub round_time_sec: Option<f64>,
    pub free_radius_km: Option<f64>,
    pub penalty_km: Option<f64>,
}

impl Settings {
    /// Build settings from a request, clamping to allowed ranges and
    /// falling back to defaults for missing or non-finite values.
    pub fn from_request(req: SettingsRequest) -> Self {
        let mut settings = Self::default();
        settings.apply(req);
        settings
    }

    /// Apply the fields present in `req`, leaving absent fields untouched.
    pub fn apply(&mut self, req: SettingsRequest) {
        if let Some(secs) = req.round_time_sec {
            self.round_time_sec = clamp_round_time(secs);
        }
        if let Some(km) = req.free_radius_km {
            self.free_radius_km = clamp_free_radius(km);
        }
        if let Some(km) = req.penalty_km {
            self.penalty_km = if km.is_finite() && km >= 0.0 {
                km
            } else {
                DEFAULT_PENALTY_KM
            };
        }
    }

    pub fn round_duration(&self) -> Duration {
        Duration::from_secs(self.round_time_sec)
    }
}

fn clamp_round_time(secs: f64) -> u64 {
    if !secs.is_finite() {
        return DEFAULT_ROUND_TIME_SEC;
    }
    let (min, max) = (*ROUND_TIME_RANGE.start(), *ROUND_TIME_RANGE.end());
    secs.round().clamp(min as f64, max as f64) as u64
}

fn clamp_free_radius(km: f64) -> f64 {
    if !km.is_finite() {
        return DEFAULT_FREE_RADIUS_KM;
    }
    km.clamp(*FREE_RADIUS_RANGE.start(), *FREE_RADIUS_RANGE.end())
}
