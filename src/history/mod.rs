//! Per-session conversation state.
//!
//! A [`Transcript`] is append-only: it opens with exactly one system turn and then
//! alternates user and assistant turns. Every user turn is answered by exactly one
//! assistant turn, even when the provider call fails.

use crate::config::prompt::{ render_system_prompt, Domain };
use crate::models::chat::{ Role, Turn };
use log::{ debug, info };
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid turn: {0}")]
    InvalidTurn(String),
}

#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn initialize(assistant_name: &str, domain: Domain) -> Self {
        Self {
            turns: vec![Turn::new(Role::System, render_system_prompt(assistant_name, domain))],
        }
    }

    pub fn append(&mut self, role: Role, content: &str) -> Result<(), SessionError> {
        if role == Role::System {
            return Err(
                SessionError::InvalidTurn("the system turn is created once, at initialization".into())
            );
        }
        if content.is_empty() {
            return Err(SessionError::InvalidTurn(format!("{} turn has empty content", role)));
        }
        let expected = self.next_role();
        if role != expected {
            return Err(
                SessionError::InvalidTurn(format!("expected {} turn next, got {}", expected, role))
            );
        }
        self.turns.push(Turn::new(role, content.to_string()));
        Ok(())
    }

    /// Every turn, system turn included, in insertion order.
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns shown to the user: everything after the system turn.
    pub fn visible_turns(&self) -> &[Turn] {
        &self.turns[1..]
    }

    pub fn system_prompt(&self) -> &str {
        self.turns[0].content()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn past_user_inputs(&self) -> Vec<String> {
        self.contents_of(Role::User)
    }

    pub fn generated_responses(&self) -> Vec<String> {
        self.contents_of(Role::Assistant)
    }

    fn contents_of(&self, role: Role) -> Vec<String> {
        self.turns
            .iter()
            .filter(|t| t.role() == role)
            .map(|t| t.content().to_string())
            .collect()
    }

    fn next_role(&self) -> Role {
        match self.turns.last().map(Turn::role) {
            Some(Role::User) => Role::Assistant,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub model_id: String,
    pub domain: Domain,
}

/// One browser session: its transcript plus the model and domain the user picked.
#[derive(Debug)]
pub struct Session {
    id: String,
    assistant_name: String,
    config: SessionConfig,
    transcript: Transcript,
}

impl Session {
    pub fn new(assistant_name: impl Into<String>, config: SessionConfig) -> Self {
        let assistant_name = assistant_name.into();
        let id = Uuid::new_v4().to_string();
        info!("Session {} started: model={}, domain={}", id, config.model_id, config.domain);
        Self {
            transcript: Transcript::initialize(&assistant_name, config.domain),
            id,
            assistant_name,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// Changes model and domain for future calls. The existing system turn is kept
    /// as-is; use [`Session::reset`] to start over with the new persona.
    pub fn reconfigure(&mut self, config: SessionConfig) {
        debug!(
            "Session {} reconfigured: model={}, domain={} (history kept)",
            self.id,
            config.model_id,
            config.domain
        );
        self.config = config;
    }

    pub fn reset(&mut self, config: SessionConfig) {
        info!("Session {} reset: model={}, domain={}", self.id, config.model_id, config.domain);
        self.transcript = Transcript::initialize(&self.assistant_name, config.domain);
        self.config = config;
    }
}
