use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ASSISTANT_NAME: &str = "Athenex";

const SYSTEM_PROMPT_TEMPLATE: &str =
    "You are {assistant_name}, a luxurious, articulate, expert-level assistant specializing in {domain} topics. \
For Tech: deep, accurate, modern answers on AI/coding/programming/gadgets. \
For Gym: expert fitness advice, routines, supplements, nutrition, recovery. \
Be concise, empowering, intelligent; do not fabricate; speak in an elegant, slightly futuristic tone.";

/// Topical focus baked into the system prompt of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Domain {
    #[default]
    Tech,
    Gym,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Tech, Domain::Gym];
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Tech => write!(f, "Tech"),
            Domain::Gym => write!(f, "Gym"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseDomainError {
    message: String,
}

impl fmt::Display for ParseDomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseDomainError {}

impl FromStr for Domain {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tech" => Ok(Domain::Tech),
            "gym" => Ok(Domain::Gym),
            _ =>
                Err(ParseDomainError {
                    message: format!("Invalid domain: '{}' (expected Tech or Gym)", s),
                }),
        }
    }
}

pub fn render_system_prompt(assistant_name: &str, domain: Domain) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{assistant_name}", assistant_name)
        .replace("{domain}", &domain.to_string())
}
