use super::city::{City, Region};
use super::geo::Coordinate;
use sqlx::SqlitePool;
use tracing::warn;

/// Read access to the city table. The pool is loaded once at startup.
#[derive(Clone)]
pub struct CityRepository {
    pool: SqlitePool,
}

impl CityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load_all(&self) -> Result<Vec<City>, sqlx::Error> {
        let rows: Vec<(String, f64, f64, i64, String)> = sqlx::query_as(
            "SELECT name, lat, lng, population, region FROM cities ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let cities = rows
            .into_iter()
            .filter_map(|(name, lat, lng, population, region)| {
                if !Coordinate::new(lat, lng).is_valid() {
                    warn!(name, "Skipping city with invalid coordinates");
                    return None;
                }
                Some(City {
                    name,
                    lat,
                    lng,
                    population: population.max(0) as u64,
                    region: Region::normalize(&region),
                })
            })
            .collect();

        Ok(cities)
    }
}
