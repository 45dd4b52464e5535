#![allow(dead_code)]

use athenex::agent::AthenexAgent;
use athenex::config::models::ModelCatalog;
use athenex::config::prompt::Domain;
use athenex::config::{ AppConfig, Credential, ProviderConfig };

use axum::extract::{ Path, State };
use axum::http::{ HeaderMap, StatusCode };
use axum::routing::post;
use axum::Router;
use serde_json::Value as JsonValue;
use std::sync::{ Arc, Mutex };
use std::time::Duration;
use tokio::net::TcpListener;

pub const TOKEN: &str = "hf_test_token";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub authorization: Option<String>,
    pub body: JsonValue,
}

/// What the fake provider answers with, in order. The last entry repeats.
#[derive(Clone)]
pub struct Canned {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Canned {
    pub fn ok(body: &str) -> Self {
        Self { status: StatusCode::OK, body: body.to_string(), delay: Duration::ZERO }
    }

    pub fn status(status: StatusCode, body: &str) -> Self {
        Self { status, body: body.to_string(), delay: Duration::ZERO }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::ok(r#"{"generated_text": "too late"}"#) }
    }
}

#[derive(Clone, Default)]
struct ProviderState {
    replies: Arc<Mutex<Vec<Canned>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

pub struct FakeProvider {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeProvider {
    pub async fn start(replies: Vec<Canned>) -> Self {
        let state = ProviderState {
            replies: Arc::new(Mutex::new(replies.into_iter().rev().collect())),
            calls: Arc::new(Mutex::new(Vec::new())),
        };
        let calls = state.calls.clone();
        let app = Router::new().route("/models/{*model}", post(handle)).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{}", addr), calls }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<ProviderState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    body: String
) -> (StatusCode, String) {
    state.calls.lock().unwrap().push(RecordedCall {
        model,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(JsonValue::Null),
    });

    let canned = {
        let mut replies = state.replies.lock().unwrap();
        if replies.len() > 1 { replies.pop().unwrap() } else { replies[0].clone() }
    };
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    (canned.status, canned.body)
}

pub fn app_config(base_url: &str, domain: Domain, timeout: Duration) -> AppConfig {
    AppConfig {
        provider: ProviderConfig::new(base_url, Credential::new(TOKEN).unwrap(), timeout).unwrap(),
        catalog: ModelCatalog::default(),
        default_model: "HuggingFaceH4/zephyr-7b-beta".to_string(),
        default_domain: domain,
        assistant_name: "Athenex".to_string(),
    }
}

pub fn agent_for(provider: &FakeProvider, domain: Domain) -> AthenexAgent {
    AthenexAgent::new(&app_config(&provider.base_url, domain, Duration::from_secs(60))).unwrap()
}
