pub mod huggingface;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

use super::{ InferenceError, InferenceRequest };
use crate::config::ProviderConfig;
use self::huggingface::HuggingFaceClient;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends one conversational request to `model_id` and returns the reply text.
    async fn complete(
        &self,
        model_id: &str,
        request: &InferenceRequest
    ) -> Result<String, InferenceError>;

    fn get_base_url(&self) -> String;
}

pub fn new_client(
    config: &ProviderConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client = HuggingFaceClient::from_config(config)?;
    Ok(Arc::new(client))
}
