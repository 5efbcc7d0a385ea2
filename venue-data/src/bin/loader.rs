use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use venue_data::DefinitionLoader;
use venue_db_sqlite::SqliteRepository;

/// Import tax, fee and service charge definitions from a CSV file.
///
/// The CSV file needs these columns:
/// - id: identifier saved on packages and services (e.g. sales-tax)
/// - name: label shown in price breakdowns
/// - kind: tax, fee or service_charge
/// - calculation: percentage or fixed
/// - value: percentage points or a currency amount
/// - applies_to: advisory scope (all, packages, services)
/// - is_active: true or false
#[derive(Parser, Debug)]
#[command(name = "venue-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing definitions
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database path or URL, created if missing
    #[arg(short, long, default_value = "venue.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database).await?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations().await?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Loading definitions from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = DefinitionLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let written = DefinitionLoader::load(&repo, &records)
        .await
        .context("Failed to load definitions into database")?;

    println!("Successfully loaded {} definitions into the database.", written);

    Ok(())
}
