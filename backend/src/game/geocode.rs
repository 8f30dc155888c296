use crate::game::core::{Coordinate, GeocodeError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Resolves a place name to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync + 'static {
    async fn geocode(&self, name: &str) -> Result<Coordinate, GeocodeError>;
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geoquiz/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, name: &str) -> Result<Coordinate, GeocodeError> {
        debug!(name, "Geocoding city");

        let hits: Vec<SearchHit> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", name), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(name.to_string()))?;

        parse_hit(&hit)
    }
}

fn parse_hit(hit: &SearchHit) -> Result<Coordinate, GeocodeError> {
    let lat = hit.lat.parse().map_err(|_| GeocodeError::InvalidResponse)?;
    let lng = hit.lon.parse().map_err(|_| GeocodeError::InvalidResponse)?;
    let coordinate = Coordinate::new(lat, lng);
    if !coordinate.is_valid() {
        return Err(GeocodeError::InvalidResponse);
    }
    Ok(coordinate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_coordinates() {
        let hits: Vec<SearchHit> =
            serde_json::from_str(r#"[{"lat": "59.9133", "lon": "10.7389", "display_name": "Oslo"}]"#)
                .unwrap();
        let coordinate = parse_hit(&hits[0]).unwrap();
        assert_eq!(coordinate, Coordinate::new(59.9133, 10.7389));
    }

    #[test]
    fn rejects_garbage_coordinates() {
        let hit = SearchHit {
            lat: "north".to_string(),
            lon: "10".to_string(),
        };
        assert!(matches!(parse_hit(&hit), Err(GeocodeError::InvalidResponse)));

        let hit = SearchHit {
            lat: "123.0".to_string(),
            lon: "10".to_string(),
        };
        assert!(matches!(parse_hit(&hit), Err(GeocodeError::InvalidResponse)));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let geocoder =
            NominatimGeocoder::new("https://example.org/", Duration::from_secs(1)).unwrap();
        assert_eq!(geocoder.base_url, "https://example.org");
    }
}
