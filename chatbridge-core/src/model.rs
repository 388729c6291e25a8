//! Wire types for the two remote protocols and the chunk type callers see.

use serde::{Deserialize, Serialize};

// ===== Conversation request (serialize side) =====

#[derive(Serialize)]
pub struct ConversationRequest<'a> {
    pub action: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub model: &'a str,
    pub parent_message_id: String,
}

#[derive(Serialize)]
pub struct WireMessage<'a> {
    pub id: String,
    pub role: &'a str,
    pub content: WireContent<'a>,
}

#[derive(Serialize)]
pub struct WireContent<'a> {
    pub content_type: &'a str,
    pub parts: Vec<&'a str>,
}

impl<'a> ConversationRequest<'a> {
    /// The `action: "next"` request shape: one user message whose sole
    /// content part is the question text.
    pub fn next_question(
        question: &'a str,
        model: &'a str,
        message_id: String,
        parent_message_id: String,
    ) -> Self {
        Self {
            action: "next",
            messages: vec![WireMessage {
                id: message_id,
                role: "user",
                content: WireContent {
                    content_type: "text",
                    parts: vec![question],
                },
            }],
            model,
            parent_message_id,
        }
    }
}

// ===== Conversation stream events (deserialize side) =====
// Deliberately lenient: the remote emits structural events with most of
// these fields absent, and those must decode to "no fragment", not an error.

#[derive(Debug, Deserialize)]
pub struct ConversationEvent {
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub content: Option<EventContent>,
}

#[derive(Debug, Deserialize)]
pub struct EventContent {
    #[serde(default)]
    pub parts: Vec<String>,
}

impl ConversationEvent {
    /// `message.content.parts[0]`, when present and non-empty.
    pub fn into_fragment(self) -> Option<String> {
        self.message?
            .content?
            .parts
            .into_iter()
            .next()
            .filter(|p| !p.is_empty())
    }
}

// ===== Identity endpoint response =====

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    /// Absent or empty means unauthenticated; any other shape is not an error
    /// here, the credential cache degrades it to `Unauthorized`.
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
}

// ===== What an answer session yields =====

/// The externally observable unit of one exchange. Delivery is at-most-once
/// per generated fragment, in generation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerChunk {
    /// Partial answer text.
    Delta(String),
    /// Terminal; nothing follows it.
    Done,
}

impl AnswerChunk {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_delta(&self) -> Option<&str> {
        match self {
            Self::Delta(s) => Some(s.as_str()),
            Self::Done => None,
        }
    }
}
