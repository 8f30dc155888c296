mod cities;
mod importer;

use clap::Parser;
use importer::import_cities;
use sqlx::SqlitePool;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seed", about = "Seed the city pool from a cities.json export")]
struct Args {
    /// Path to the cities JSON export (array of {name, lat, lng, population, continent, iso2})
    #[arg(short, long)]
    input: PathBuf,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Only include cities with at least this population
    #[arg(long, default_value_t = 0)]
    min_population: u64,

    /// Clear existing cities before import
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to database...");
    let pool = SqlitePool::connect(&args.database_url).await?;

    // Run migrations to ensure schema exists
    sqlx::migrate!("../../backend/migrations").run(&pool).await?;

    if args.clear {
        println!("Clearing existing cities...");
        sqlx::query("DELETE FROM cities").execute(&pool).await?;
    }

    println!("Parsing cities: {:?}", args.input);
    let records = cities::parse_cities(&args.input)?;
    println!("Found {} city records", records.len());

    println!("Importing cities...");
    let stats = import_cities(&pool, records, args.min_population).await?;

    println!();
    println!("Import complete:");
    println!("  Filtered (passed all checks): {}", stats.filtered);
    println!("  Inserted into database:       {}", stats.inserted);
    println!("  Skipped (invalid/duplicate):  {}", stats.skipped);

    Ok(())
}
