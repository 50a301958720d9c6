//! Utility to import a food catalog CSV into the database
//!
//! Usage: import_catalog <catalog.csv> [database path]

use std::path::PathBuf;

use mealtrack::catalog;
use mealtrack::config::Config;
use mealtrack::db::{migrations, Database};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("mealtrack=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let catalog_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: import_catalog <catalog.csv> [database path]");
            std::process::exit(2);
        }
    };

    let db_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| Config::load().database_path);
    println!("Database path: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&db_path)?;
    database.with_conn(migrations::run_migrations)?;

    let summary = database.with_conn(|conn| catalog::import_catalog(conn, &catalog_path))?;

    println!("Catalog: {}", catalog_path.display());
    println!("  Inserted: {}", summary.inserted);
    println!("  Skipped (already present): {}", summary.skipped);

    Ok(())
}
