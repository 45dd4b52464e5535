use crate::agent::AthenexAgent;
use crate::config::models::ModelOption;
use crate::config::prompt::Domain;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{ routing::get, Router, extract::State, response::{ Html, IntoResponse }, Json };
use axum_server::tls_rustls::RustlsConfig;
use rustls::ServerConfig;
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Serialize)]
struct CatalogResponse {
    models: Vec<ModelOption>,
    domains: Vec<String>,
    default_model: String,
    default_domain: String,
    ws_port: Option<u16>,
    ws_secure: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AthenexAgent>,
    pub ws_port: Option<u16>,
    pub ws_secure: bool,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/models", get(models_handler))
        .route("/api/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    http_port: u16,
    state: AppState,
    tls_config: Option<Arc<ServerConfig>>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    let app = router(state);

    match tls_config {
        Some(config) => {
            let mut config = (*config).clone();
            config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
            let rustls_config = RustlsConfig::from_config(Arc::new(config));
            info!("Starting HTTPS server on: https://{}", addr);
            tokio::spawn(async move {
                if let Err(e) = axum_server::bind_rustls(addr, rustls_config)
                    .serve(app.into_make_service()).await
                {
                    error!("HTTPS server error: {}", e);
                }
            });
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
            })?;
            info!("Starting HTTP server on: http://{}", addr);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    error!("HTTP server error: {}", e);
                }
            });
        }
    }

    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    let defaults = state.agent.default_session_config();
    Json(CatalogResponse {
        models: state.agent.catalog().models().to_vec(),
        domains: Domain::ALL.iter().map(|d| d.to_string()).collect(),
        default_model: defaults.model_id,
        default_domain: defaults.domain.to_string(),
        ws_port: state.ws_port,
        ws_secure: state.ws_secure,
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
