//! Core data models used throughout DocuSense.
//!
//! These are the document, chat, and challenge types held in a session and
//! returned over the HTTP API. Field names are `camelCase` on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded document after text extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    pub content_type: String,
    pub content: String,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

/// A single chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Millisecond timestamp, strictly increasing within a session.
    pub id: i64,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A prior turn forwarded to the model as conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role,
            content: m.content.clone(),
        }
    }
}

/// Model output for the summarize action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub summary: String,
}

/// Model output for the ask action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Model output for the challenge-question action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeQuestions {
    pub questions: Vec<String>,
}

/// Verdict on a user's answer to a challenge question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub is_correct: bool,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub question: String,
    pub answer: String,
    pub evaluation: Option<Evaluation>,
    pub is_evaluating: bool,
}

impl Challenge {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: String::new(),
            evaluation: None,
            is_evaluating: false,
        }
    }
}

/// Everything held for one uploaded document until it is reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub document: Document,
    pub summary: Option<String>,
    pub messages: Vec<Message>,
    pub challenges: Vec<Challenge>,
    pub created_at: DateTime<Utc>,
}
