//! Meal Tracker
//!
//! An MCP server for cafeteria meal logging and nutrition analytics.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use mealtrack::build_info;
use mealtrack::catalog;
use mealtrack::config::Config;
use mealtrack::db::{self, Database};
use mealtrack::mcp::MealTrackService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mealtrack=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::load();
    eprintln!("Database path: {}", config.database_path.display());
    eprintln!("Default locale: {}", config.locale);

    // Ensure data directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    // A bad catalog file should not keep the server from starting
    if let Some(catalog_path) = &config.catalog_path {
        if let Err(e) = database.with_conn(|conn| catalog::import_catalog(conn, catalog_path)) {
            tracing::warn!("Catalog import from {} failed: {}", catalog_path.display(), e);
        }
    }

    let service = MealTrackService::new(&config, database);

    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
