//! # Signalen API Main Entry Point
//!
//! This is the main entry point for the Signalen API service.

use migration::{Migrator, MigratorTrait};
use signalen::{
    config::ConfigLoader, db::init_pool, seeds::seed_reference_data, server::run_server, telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    // Log the loaded configuration (secrets redacted)
    println!("Loaded configuration for profile: {}", config.profile);
    if let Ok(redacted_json) = config.redacted_json() {
        println!("Configuration: {}", redacted_json);
    }

    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;
    seed_reference_data(&db).await?;

    // Start the server with the loaded configuration
    run_server(config, db).await
}
