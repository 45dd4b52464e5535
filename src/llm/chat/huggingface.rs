use async_trait::async_trait;
use log::{ debug, info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde_json::Value as JsonValue;
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

use super::ChatClient;
use crate::config::ProviderConfig;
use crate::llm::{ extract_generated_text, InferenceError, InferenceRequest };

/// Client for the Hugging Face hosted Inference API (`POST {base}/models/{model_id}`).
pub struct HuggingFaceClient {
    http: HttpClient,
    base_url: Url,
    timeout: Duration,
}

impl HuggingFaceClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.credential.expose()))
            .map_err(|e| format!("Invalid API token format: {}", e))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        })
    }

    fn endpoint(&self, model_id: &str) -> Result<Url, InferenceError> {
        self.base_url
            .join(&format!("models/{}", model_id.trim_start_matches('/')))
            .map_err(|e| InferenceError::Transport(format!("Invalid model endpoint for '{}': {}", model_id, e)))
    }
}

#[async_trait]
impl ChatClient for HuggingFaceClient {
    async fn complete(
        &self,
        model_id: &str,
        request: &InferenceRequest
    ) -> Result<String, InferenceError> {
        let url = self.endpoint(model_id)?;
        debug!(
            "POST {} (history: {} turns, timeout: {:?})",
            url,
            request.inputs.past_user_inputs.len() + request.inputs.generated_responses.len(),
            self.timeout
        );

        let response = self.http
            .post(url.clone())
            .json(request)
            .send().await
            .map_err(|e| {
                warn!("Provider request to {} failed: {}", url, e);
                InferenceError::transport(&e)
            })?;

        let status = response.status();
        let response = response.error_for_status().map_err(|e| {
            warn!("Provider returned {} for model {}", status, model_id);
            InferenceError::transport(&e)
        })?;

        let bytes = response.bytes().await.map_err(|e| InferenceError::transport(&e))?;
        let body: JsonValue = serde_json
            ::from_slice(&bytes)
            .map_err(|e| InferenceError::Transport(format!("Invalid JSON in provider response: {}", e)))?;

        let reply = extract_generated_text(&body);
        match &reply {
            Ok(text) => info!("Model {} replied ({} chars)", model_id, text.len()),
            Err(_) => warn!("Model {} returned an unrecognized body: {}", model_id, truncate(&body.to_string(), 200)),
        }
        reply
    }

    fn get_base_url(&self) -> String {
        self.base_url.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
