mod auth;
mod error;
mod handlers;
mod reconcile;
mod services;
mod setup;
mod state;
mod telemetry;

use leadmag_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    telemetry::init_telemetry();
    tracing::info!("Configuration loaded and validated successfully");

    // Initialize the application (database, storage, services, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    reconcile::spawn_reconciler(state);

    // Start the server
    setup::server::start_server(&config, router).await?;

    Ok(())
}
