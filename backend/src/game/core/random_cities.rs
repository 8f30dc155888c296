use super::city::{City, Region};
use rand::Rng;
use rand::seq::SliceRandom;

/// Cities at or below this population never appear in random games
pub const MIN_POPULATION: u64 = 500_000;

/// How many cities each region contributes to a random game
pub const REGION_QUOTAS: [(Region, usize); 3] = [
    (Region::Europe, 5),
    (Region::NorthAmerica, 3),
    (Region::Other, 2),
];

/// Stratified draw: filter by population, then shuffle each region's bucket
/// and take its quota. A short bucket yields what it has.
pub fn select_random_cities<R: Rng + ?Sized>(pool: &[City], rng: &mut R) -> Vec<City> {
    let mut selected = Vec::new();

    for (region, quota) in REGION_QUOTAS {
        let mut bucket: Vec<&City> = pool
            .iter()
            .filter(|c| c.region == region && c.population > MIN_POPULATION)
            .collect();
        bucket.shuffle(rng);
        selected.extend(bucket.into_iter().take(quota).cloned());
    }

    selected
}
