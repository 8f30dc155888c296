use super::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse region used to stratify random city draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Europe,
    NorthAmerica,
    Other,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Europe, Region::NorthAmerica, Region::Other];

    /// Map any of the label spellings found in city exports onto a region.
    ///
    /// Accepts `EUROPE`, `Europe`, `north_america`, `North America`,
    /// `north-america` and similar; anything unrecognised is `Other`.
    pub fn normalize(label: &str) -> Self {
        let key: String = label
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "europe" | "eu" => Region::Europe,
            "northamerica" | "na" => Region::NorthAmerica,
            _ => Region::Other,
        }
    }

    /// Canonical label as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Europe => "europe",
            Region::NorthAmerica => "north_america",
            Region::Other => "other",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub population: u64,
    pub region: Region,
}

impl City {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}
