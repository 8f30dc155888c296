use crate::cities::CityRecord;
use geoquiz::game::core::{Coordinate, Region};
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Statistics from an import operation
#[derive(Debug, Default)]
pub struct ImportStats {
    /// Number of records that passed all filters
    pub filtered: usize,
    /// Number of rows actually inserted (existing rows are ignored)
    pub inserted: usize,
    /// Number of records skipped (bad coordinates, duplicates, small cities)
    pub skipped: usize,
}

/// A city ready to be inserted into the database
#[derive(Debug, PartialEq)]
struct CityToInsert {
    name: String,
    lat: f64,
    lng: f64,
    population: u64,
    region: Region,
    iso2: Option<String>,
}

fn dedup_key(name: &str, lat: f64, lng: f64) -> String {
    format!("{name}|{lat:.4}|{lng:.4}")
}

/// Drop unusable records and duplicates, normalising region labels
fn prepare(records: Vec<CityRecord>, min_population: u64, stats: &mut ImportStats) -> Vec<CityToInsert> {
    let mut seen = HashSet::new();

    records
        .into_iter()
        .filter_map(|record| {
            let name = record.name.trim().to_string();
            if name.is_empty() || !Coordinate::new(record.lat, record.lng).is_valid() {
                stats.skipped += 1;
                return None;
            }
            if record.population < min_population {
                stats.skipped += 1;
                return None;
            }
            if !seen.insert(dedup_key(&name, record.lat, record.lng)) {
                stats.skipped += 1;
                return None;
            }

            Some(CityToInsert {
                name,
                lat: record.lat,
                lng: record.lng,
                population: record.population,
                region: Region::normalize(record.region.as_deref().unwrap_or_default()),
                iso2: record.iso2.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

/// Import cities into the database.
///
/// Uses INSERT OR IGNORE so re-running over the same export is a no-op.
pub async fn import_cities(
    pool: &SqlitePool,
    records: Vec<CityRecord>,
    min_population: u64,
) -> Result<ImportStats, Box<dyn std::error::Error>> {
    let mut stats = ImportStats::default();
    let cities = prepare(records, min_population, &mut stats);
    stats.filtered = cities.len();

    const BATCH_SIZE: usize = 500;

    for chunk in cities.chunks(BATCH_SIZE) {
        let mut query = String::from(
            "INSERT OR IGNORE INTO cities (name, lat, lng, population, region, iso2) VALUES ",
        );

        for (i, _) in chunk.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push_str("(?, ?, ?, ?, ?, ?)");
        }

        let mut q = sqlx::query(&query);
        for city in chunk {
            q = q
                .bind(&city.name)
                .bind(city.lat)
                .bind(city.lng)
                .bind(city.population as i64)
                .bind(city.region.as_str())
                .bind(&city.iso2);
        }

        let result = q.execute(pool).await?;
        stats.inserted += result.rows_affected() as usize;
    }

    Ok(stats)
}
