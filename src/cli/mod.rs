use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Provider Args ---
    /// Bearer token for the Hugging Face Inference API. Required.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Base URL of the inference provider; requests go to {base}/models/{model_id}.
    #[arg(long, env = "ATHENEX_PROVIDER_URL", default_value = "https://api-inference.huggingface.co")]
    pub provider_base_url: String,

    /// Timeout in seconds for a single provider call.
    #[arg(long, env = "ATHENEX_REQUEST_TIMEOUT", default_value = "60")]
    pub request_timeout_secs: u64,

    // --- Session Defaults ---
    /// Default model for new sessions, by provider id or display name. Defaults to the first catalog entry.
    #[arg(long, env = "ATHENEX_MODEL")]
    pub model: Option<String>,

    /// Default domain focus for new sessions (Tech, Gym).
    #[arg(long, env = "ATHENEX_DOMAIN", default_value = "Tech")]
    pub domain: String,

    /// Name the assistant introduces itself with in the system prompt.
    #[arg(long, env = "ATHENEX_ASSISTANT_NAME", default_value = "Athenex")]
    pub assistant_name: String,

    /// Optional JSON file replacing the built-in model catalog ([{"name": ..., "id": ...}]).
    #[arg(long, env = "ATHENEX_MODELS_PATH")]
    pub models_path: Option<String>,

    // --- Server Args ---
    /// Host address and port for the WebSocket chat server.
    #[arg(long, env = "ATHENEX_SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Port for the HTTP server (chat page and model catalog). Disabled if unset.
    #[arg(long, env = "ATHENEX_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Optional path to the TLS certificate file (PEM format) for enabling WSS/HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling WSS/HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[cfg(test)]
impl Args {
    /// Built field by field so that env fallbacks never leak into tests.
    pub(crate) fn for_tests() -> Self {
        Self {
            hf_token: None,
            provider_base_url: "https://api-inference.huggingface.co".to_string(),
            request_timeout_secs: 60,
            model: None,
            domain: "Tech".to_string(),
            assistant_name: "Athenex".to_string(),
            models_path: None,
            server_addr: "127.0.0.1:4000".to_string(),
            http_port: None,
            tls_cert_path: None,
            tls_key_path: None,
            enable_tls: false,
        }
    }
}
