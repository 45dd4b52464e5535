use crate::config::models::ModelCatalog;
use crate::config::prompt::Domain;
use crate::config::AppConfig;
use crate::history::{ Session, SessionConfig, SessionError, Transcript };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::llm::{ InferenceError, InferenceRequest };
use crate::models::chat::Role;

use log::{ error, info, warn };
use std::error::Error;
use std::sync::Arc;

pub const FALLBACK_REPLY: &str = "Athenex couldn't generate a proper response. Try another query.";
pub const CANCELLED_REPLY: &str = "Error: request cancelled";

/// Collapses a provider outcome into the text of the assistant turn.
pub fn reply_text(outcome: Result<String, InferenceError>) -> String {
    match outcome {
        Ok(reply) if !reply.is_empty() => reply,
        Ok(_) | Err(InferenceError::UnrecognizedShape) => FALLBACK_REPLY.to_string(),
        Err(InferenceError::Transport(description)) => format!("Error: {}", description),
    }
}

/// Holds the transcript between the user turn and its reply. If the call is
/// dropped before a reply arrives, the cancellation reply is appended instead.
struct PendingReply<'a> {
    transcript: &'a mut Transcript,
    resolved: bool,
}

impl<'a> PendingReply<'a> {
    fn open(transcript: &'a mut Transcript, user_text: &str) -> Result<Self, SessionError> {
        transcript.append(Role::User, user_text)?;
        Ok(Self { transcript, resolved: false })
    }

    fn resolve(mut self, reply: &str) -> Result<(), SessionError> {
        self.transcript.append(Role::Assistant, reply)?;
        self.resolved = true;
        Ok(())
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            warn!("Provider call cancelled before a reply arrived");
            if let Err(e) = self.transcript.append(Role::Assistant, CANCELLED_REPLY) {
                error!("Failed to record cancellation: {}", e);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Unknown model '{0}'")]
    UnknownModel(String),
    #[error("{0}")]
    InvalidDomain(#[from] crate::config::prompt::ParseDomainError),
}

#[derive(Clone)]
pub struct AthenexAgent {
    chat_client: Arc<dyn ChatClient>,
    catalog: ModelCatalog,
    default_model: String,
    default_domain: Domain,
    assistant_name: String,
}

impl AthenexAgent {
    pub fn new(config: &AppConfig) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_client = new_chat_client(&config.provider)?;
        info!(
            "Chat client configured: BaseURL={}, Timeout={:?}",
            chat_client.get_base_url(),
            config.provider.timeout
        );
        Ok(Self::with_client(chat_client, config))
    }

    pub fn with_client(chat_client: Arc<dyn ChatClient>, config: &AppConfig) -> Self {
        Self {
            chat_client,
            catalog: config.catalog.clone(),
            default_model: config.default_model.clone(),
            default_domain: config.default_domain,
            assistant_name: config.assistant_name.clone(),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn default_session_config(&self) -> SessionConfig {
        SessionConfig {
            model_id: self.default_model.clone(),
            domain: self.default_domain,
        }
    }

    pub fn start_session(&self) -> Session {
        Session::new(self.assistant_name.clone(), self.default_session_config())
    }

    /// Resolves a `configure`/`reset` request against the catalog, keeping the
    /// session's current values for anything not given.
    pub fn select(
        &self,
        current: &SessionConfig,
        model: Option<&str>,
        domain: Option<&str>
    ) -> Result<SessionConfig, SelectionError> {
        let model_id = match model {
            Some(key) =>
                self.catalog
                    .resolve(key)
                    .ok_or_else(|| SelectionError::UnknownModel(key.to_string()))?
                    .id.clone(),
            None => current.model_id.clone(),
        };
        let domain = match domain {
            Some(raw) => raw.parse()?,
            None => current.domain,
        };
        Ok(SessionConfig { model_id, domain })
    }

    /// Runs one user submission through the provider. Provider failures never
    /// escape: they become the assistant turn. The only error is an empty
    /// `user_text`, which leaves the transcript untouched.
    pub async fn converse(
        &self,
        session: &mut Session,
        user_text: &str
    ) -> Result<String, SessionError> {
        if user_text.trim().is_empty() {
            return Err(SessionError::InvalidTurn("user message is empty".into()));
        }

        let model_id = session.config().model_id.clone();
        let session_id = session.id().to_string();
        let request = InferenceRequest::from_transcript(session.transcript(), user_text);

        let pending = PendingReply::open(session.transcript_mut(), user_text)?;
        info!("Session {}: sending message to {}", session_id, model_id);
        let outcome = self.chat_client.complete(&model_id, &request).await;
        if let Err(e) = &outcome {
            warn!("Session {}: provider call failed: {}", session_id, e);
        }

        let reply = reply_text(outcome);
        pending.resolve(&reply)?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ Credential, ProviderConfig };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, InferenceError>>>,
        requests: Mutex<Vec<(String, InferenceRequest)>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, InferenceError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn complete(
            &self,
            model_id: &str,
            request: &InferenceRequest
        ) -> Result<String, InferenceError> {
            self.requests.lock().unwrap().push((model_id.to_string(), request.clone()));
            self.replies.lock().unwrap().pop().unwrap_or(Err(InferenceError::UnrecognizedShape))
        }

        fn get_base_url(&self) -> String {
            "scripted://".to_string()
        }
    }

    struct NeverReplies;

    #[async_trait]
    impl ChatClient for NeverReplies {
        async fn complete(&self, _: &str, _: &InferenceRequest) -> Result<String, InferenceError> {
            std::future::pending().await
        }

        fn get_base_url(&self) -> String {
            "pending://".to_string()
        }
    }

    fn app_config() -> AppConfig {
        AppConfig {
            provider: ProviderConfig::new(
                "http://127.0.0.1:9",
                Credential::new("hf_test").unwrap(),
                Duration::from_secs(60)
            ).unwrap(),
            catalog: ModelCatalog::default(),
            default_model: "microsoft/phi-2".to_string(),
            default_domain: Domain::Tech,
            assistant_name: "Athenex".to_string(),
        }
    }

    #[test]
    fn reply_text_collapses_failures_to_visible_messages() {
        assert_eq!(reply_text(Ok("Hi.".into())), "Hi.");
        assert_eq!(reply_text(Ok(String::new())), FALLBACK_REPLY);
        assert_eq!(reply_text(Err(InferenceError::UnrecognizedShape)), FALLBACK_REPLY);
        assert_eq!(
            reply_text(Err(InferenceError::Transport("connection refused".into()))),
            "Error: connection refused"
        );
    }

    #[tokio::test]
    async fn second_request_carries_prior_turns() {
        let client = ScriptedClient::new(vec![Ok("Hello, seeker.".into()), Ok("Learn Rust.".into())]);
        let agent = AthenexAgent::with_client(client.clone(), &app_config());
        let mut session = agent.start_session();

        assert_eq!(agent.converse(&mut session, "hi").await.unwrap(), "Hello, seeker.");
        assert_eq!(agent.converse(&mut session, "more tech tips").await.unwrap(), "Learn Rust.");

        let requests = client.requests.lock().unwrap();
        assert!(requests[0].1.inputs.past_user_inputs.is_empty());
        let (model, second) = &requests[1];
        assert_eq!(model, "microsoft/phi-2");
        assert_eq!(second.inputs.past_user_inputs, vec!["hi"]);
        assert_eq!(second.inputs.generated_responses, vec!["Hello, seeker."]);
        assert_eq!(second.inputs.text, "more tech tips");
        assert_eq!(session.transcript().len(), 5);
    }

    #[tokio::test]
    async fn failures_still_append_user_and_assistant_turns() {
        let client = ScriptedClient::new(vec![
            Err(InferenceError::Transport("timed out".into())),
            Err(InferenceError::UnrecognizedShape),
        ]);
        let agent = AthenexAgent::with_client(client, &app_config());
        let mut session = agent.start_session();

        assert_eq!(agent.converse(&mut session, "a").await.unwrap(), "Error: timed out");
        assert_eq!(agent.converse(&mut session, "b").await.unwrap(), FALLBACK_REPLY);

        let visible: Vec<_> = session
            .transcript()
            .visible_turns()
            .iter()
            .map(|t| (t.role(), t.content().to_string()))
            .collect();
        assert_eq!(visible, vec![
            (Role::User, "a".to_string()),
            (Role::Assistant, "Error: timed out".to_string()),
            (Role::User, "b".to_string()),
            (Role::Assistant, FALLBACK_REPLY.to_string())
        ]);
    }

    #[tokio::test]
    async fn blank_client_reply_falls_back_and_session_keeps_working() {
        let client = ScriptedClient::new(vec![Ok(String::new()), Ok(" ".into()), Ok("Recovered.".into())]);
        let agent = AthenexAgent::with_client(client, &app_config());
        let mut session = agent.start_session();

        assert_eq!(agent.converse(&mut session, "first").await.unwrap(), FALLBACK_REPLY);
        assert_eq!(agent.converse(&mut session, "second").await.unwrap(), " ");
        assert_eq!(agent.converse(&mut session, "third").await.unwrap(), "Recovered.");

        let roles: Vec<_> = session.transcript().history().iter().map(|t| t.role()).collect();
        assert_eq!(roles, vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant
        ]);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_touching_history() {
        let agent = AthenexAgent::with_client(ScriptedClient::new(vec![]), &app_config());
        let mut session = agent.start_session();
        assert!(agent.converse(&mut session, "   ").await.is_err());
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_call_is_answered_with_cancellation_reply() {
        let agent = AthenexAgent::with_client(Arc::new(NeverReplies), &app_config());
        let mut session = agent.start_session();

        let call = agent.converse(&mut session, "are you there?");
        assert!(tokio::time::timeout(Duration::from_millis(20), call).await.is_err());

        let turns = session.transcript().visible_turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content(), "are you there?");
        assert_eq!(turns[1].content(), CANCELLED_REPLY);
    }

    #[test]
    fn select_resolves_against_catalog_and_keeps_unset_fields() {
        let agent = AthenexAgent::with_client(ScriptedClient::new(vec![]), &app_config());
        let current = agent.default_session_config();

        let next = agent.select(&current, Some("Zephyr 7B Beta"), None).unwrap();
        assert_eq!(next.model_id, "HuggingFaceH4/zephyr-7b-beta");
        assert_eq!(next.domain, Domain::Tech);

        let next = agent.select(&current, None, Some("gym")).unwrap();
        assert_eq!(next.model_id, "microsoft/phi-2");
        assert_eq!(next.domain, Domain::Gym);

        assert!(matches!(agent.select(&current, Some("gpt-4"), None), Err(SelectionError::UnknownModel(_))));
        assert!(agent.select(&current, None, Some("yoga")).is_err());
    }
}
