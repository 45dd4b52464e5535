pub mod api;
pub mod tls;
pub mod websocket;

use crate::agent::AthenexAgent;
use crate::cli::Args;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

pub struct Server {
    addr: String,
    agent: Arc<AthenexAgent>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, agent: Arc<AthenexAgent>, args: Args) -> Self {
        Self { addr, agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let tls_config = match tls::tls_paths(&self.args)? {
            Some((cert, key)) => Some(tls::load_tls_config(cert, key)?),
            None => None,
        };

        if let Some(http_port) = self.args.http_port {
            self.start_http_server(http_port, tls_config.clone()).await?;
        }

        self.start_ws_server(tls_config).await
    }

    async fn start_http_server(
        &self,
        http_port: u16,
        tls_config: Option<Arc<ServerConfig>>
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let state = api::AppState {
            agent: self.agent.clone(),
            ws_port: self.addr.parse::<SocketAddr>().ok().map(|a| a.port()),
            ws_secure: tls_config.is_some(),
        };
        api::start_http_server(http_port, state, tls_config).await
    }

    async fn start_ws_server(
        &self,
        tls_config: Option<Arc<ServerConfig>>
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        websocket::start_ws_server(
            &self.addr,
            self.agent.clone(),
            tls_config.map(TlsAcceptor::from)
        ).await
    }
}
