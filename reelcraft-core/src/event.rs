//! User-visible events emitted by stages

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Progress or summary line
    Status,
    /// A failure the user should see
    Error,
    /// Text produced by an LLM stage
    Message,
}

/// A single event, authored by a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub author: String,
    pub kind: EventKind,
    pub text: String,
}

impl Event {
    pub fn new(author: impl Into<String>, kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            kind,
            text: text.into(),
        }
    }

    pub fn status(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, EventKind::Status, text)
    }

    pub fn error(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, EventKind::Error, text)
    }

    pub fn message(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, EventKind::Message, text)
    }

    pub fn is_error(&self) -> bool {
        self.kind == EventKind::Error
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.author, self.text)
    }
}
