use sarwatch_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    sarwatch_api::init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (catalog, routes)
    let (_state, router) = sarwatch_api::setup::initialize_app(&config).await?;

    // Start the server
    sarwatch_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
