pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;

use agent::AthenexAgent;
use cli::Args;
use config::AppConfig;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("HTTP Port: {:?}", args.http_port);
    info!("Provider URL: {}", config.provider.base_url);
    info!("Request Timeout: {:?}", config.provider.timeout);
    info!("Models Available: {}", config.catalog.models().len());
    info!("Default Model: {}", config.default_model);
    info!("Default Domain: {}", config.default_domain);
    info!("Assistant Name: {}", config.assistant_name);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(AthenexAgent::new(&config)?);
    let server = Server::new(args.server_addr.clone(), agent, args);
    server.run().await?;

    Ok(())
}
