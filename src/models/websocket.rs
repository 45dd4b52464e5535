use serde::{ Serialize, Deserialize };
use super::chat::Turn;

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "chat")] Chat {
        content: String,
    },
    /// Changes model and/or domain for future replies; history is kept.
    #[serde(rename = "configure")] Configure {
        model: Option<String>,
        domain: Option<String>,
    },
    /// Starts a fresh transcript, optionally with a new model and/or domain.
    #[serde(rename = "reset")] Reset {
        model: Option<String>,
        domain: Option<String>,
    },
    #[serde(rename = "history")]
    History,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "session")] Session {
        session_id: String,
        model: String,
        domain: String,
    },
    #[serde(rename = "response")] Response {
        content: String,
        timestamp: i64,
    },
    #[serde(rename = "history")] History {
        turns: Vec<Turn>,
    },
    #[serde(rename = "configured")] Configured {
        model: String,
        domain: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
    #[serde(rename = "processing")]
    Processing,
}
