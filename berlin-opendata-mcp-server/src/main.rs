mod config;
mod server;
mod transport;

use config::ServerConfig;
use server::BerlinMcpServer;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from_env()?;
    BerlinMcpServer::bootstrap(config).await?;

    Ok(())
}
