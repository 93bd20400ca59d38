use cerebrum::config::AppConfig;
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    cerebrum::init_logging();

    println!("Cerebrum: Helmholtz Marketplace resource catalog");

    let config = AppConfig::load()?;
    info!(
        "Configuration loaded: server={}:{} backend={:?} auth={}",
        config.server.host,
        config.server.port,
        config.database.backend,
        if config.auth.enabled { "on" } else { "off" }
    );

    cerebrum::run_with_config(config).await
}
