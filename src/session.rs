//! In-memory session store.
//!
//! A session owns one uploaded document together with its chat log and
//! challenge list. Nothing is persisted; reset removes the session.
//!
//! The lock is never held across a model call. Evaluation is split into
//! [`SessionStore::begin_evaluation`] and [`SessionStore::finish_evaluation`]
//! so the `is_evaluating` flag guards against double submission while the
//! model runs.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Challenge, Document, Evaluation, HistoryEntry, Message, Role, Session};

#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    NotFound(Uuid),
    ChallengeOutOfRange { index: usize, len: usize },
    AlreadyEvaluated(usize),
    EvaluationInProgress(usize),
    /// The challenge list was regenerated while an answer was being graded.
    ChallengeReplaced(usize),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotFound(id) => write!(f, "document session not found: {}", id),
            SessionError::ChallengeOutOfRange { index, len } => {
                write!(f, "challenge {} not found ({} challenges)", index, len)
            }
            SessionError::AlreadyEvaluated(i) => {
                write!(f, "challenge {} has already been evaluated", i)
            }
            SessionError::EvaluationInProgress(i) => {
                write!(f, "challenge {} is already being evaluated", i)
            }
            SessionError::ChallengeReplaced(i) => {
                write!(f, "challenge {} was replaced before its evaluation finished", i)
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, document: Document) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            document,
            summary: None,
            messages: Vec::new(),
            challenges: Vec::new(),
            created_at: Utc::now(),
        };
        self.inner
            .write()
            .await
            .insert(session.id, session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> Result<Session, SessionError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    /// Drops the session. Returns whether it existed.
    pub async fn reset(&self, id: Uuid) -> bool {
        self.inner.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn push_message(
        &self,
        id: Uuid,
        role: Role,
        content: impl Into<String>,
        reference: Option<String>,
    ) -> Result<Message, SessionError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;

        let now = Utc::now().timestamp_millis();
        let id = match session.messages.last() {
            Some(last) if last.id >= now => last.id + 1,
            _ => now,
        };
        let message = Message {
            id,
            role,
            content: content.into(),
            reference,
        };
        session.messages.push(message.clone());
        Ok(message)
    }

    /// The most recent `max` messages, oldest first.
    pub async fn history(&self, id: Uuid, max: usize) -> Result<Vec<HistoryEntry>, SessionError> {
        let sessions = self.inner.read().await;
        let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        let skip = session.messages.len().saturating_sub(max);
        Ok(session.messages[skip..].iter().map(HistoryEntry::from).collect())
    }

    pub async fn set_summary(&self, id: Uuid, summary: String) -> Result<(), SessionError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.summary = Some(summary);
        Ok(())
    }

    /// Replaces the challenge list, discarding earlier answers.
    pub async fn set_challenges(
        &self,
        id: Uuid,
        questions: Vec<String>,
    ) -> Result<Vec<Challenge>, SessionError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.challenges = questions.into_iter().map(Challenge::new).collect();
        Ok(session.challenges.clone())
    }

    /// Records the answer and marks the challenge as evaluating.
    ///
    /// Returns the question text and document content needed for the model
    /// call, so the caller does not need to re-read the session.
    pub async fn begin_evaluation(
        &self,
        id: Uuid,
        index: usize,
        answer: &str,
    ) -> Result<(String, String), SessionError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        let len = session.challenges.len();
        let challenge = session
            .challenges
            .get_mut(index)
            .ok_or(SessionError::ChallengeOutOfRange { index, len })?;

        if challenge.evaluation.is_some() {
            return Err(SessionError::AlreadyEvaluated(index));
        }
        if challenge.is_evaluating {
            return Err(SessionError::EvaluationInProgress(index));
        }

        challenge.answer = answer.to_string();
        challenge.is_evaluating = true;
        Ok((challenge.question.clone(), session.document.content.clone()))
    }

    /// Stores the verdict for the question returned by `begin_evaluation`.
    ///
    /// If the challenge list was regenerated in the meantime the verdict is
    /// dropped, so it never lands on a question the user did not answer.
    pub async fn finish_evaluation(
        &self,
        id: Uuid,
        index: usize,
        question: &str,
        evaluation: Evaluation,
    ) -> Result<Challenge, SessionError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        let challenge = session
            .challenges
            .get_mut(index)
            .filter(|c| c.is_evaluating && c.question == question)
            .ok_or(SessionError::ChallengeReplaced(index))?;

        challenge.evaluation = Some(evaluation);
        challenge.is_evaluating = false;
        Ok(challenge.clone())
    }

    /// Clears the evaluating flag without recording a verdict.
    ///
    /// A no-op when the challenge at `index` is no longer `question`.
    pub async fn abort_evaluation(&self, id: Uuid, index: usize, question: &str) {
        let mut sessions = self.inner.write().await;
        if let Some(challenge) = sessions
            .get_mut(&id)
            .and_then(|s| s.challenges.get_mut(index))
            .filter(|c| c.question == question)
        {
            challenge.is_evaluating = false;
        }
    }
}
