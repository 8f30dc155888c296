use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One record of a cities.json export
#[derive(Debug, Clone, Deserialize)]
pub struct CityRecord {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub population: u64,
    /// Older exports call this `continent`
    #[serde(default, alias = "continent")]
    pub region: Option<String>,
    #[serde(default)]
    pub iso2: Option<String>,
}

pub fn parse_cities(path: &Path) -> Result<Vec<CityRecord>, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    let records = serde_json::from_str(&raw)?;
    Ok(records)
}
