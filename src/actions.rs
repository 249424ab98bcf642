//! Model-backed actions: summarize, ask, challenge questions, evaluate.
//!
//! Each action has the same shape: reject empty input, build the prompt,
//! call the model with an output schema, and return the typed result. Model
//! failures do not propagate. They are logged and replaced with a fixed
//! user-facing fallback so the caller always has something to show.

use tracing::{error, info};

use crate::llm::{generate_typed, GenerateRequest, LanguageModel};
use crate::models::{Answer, ChallengeQuestions, Evaluation, HistoryEntry, Summary};
use crate::prompt::{self, CHALLENGE_COUNT};

pub const SUMMARY_FALLBACK: &str = "Could not generate a summary for this document.";
pub const ANSWER_FALLBACK: &str = "I encountered an error trying to answer the question.";
pub const EVALUATION_FALLBACK: &str = "Could not evaluate the answer due to an error.";

/// Input rejected before any model call.
#[derive(Debug, PartialEq, Eq)]
pub enum ActionError {
    EmptyInput(&'static str),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::EmptyInput(field) => write!(f, "{} must not be empty", field),
        }
    }
}

impl std::error::Error for ActionError {}

fn require(field: &'static str, value: &str) -> Result<(), ActionError> {
    if value.trim().is_empty() {
        return Err(ActionError::EmptyInput(field));
    }
    Ok(())
}

pub async fn summarize(model: &dyn LanguageModel, document: &str) -> Result<Summary, ActionError> {
    require("document", document)?;

    let request = GenerateRequest::new(
        prompt::summary_prompt(document),
        "document_summary",
        prompt::summary_schema(),
    );
    match generate_typed::<Summary>(model, &request).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            error!(error = %format!("{:#}", e), "error generating summary");
            Ok(Summary {
                summary: SUMMARY_FALLBACK.to_string(),
            })
        }
    }
}

pub async fn ask(
    model: &dyn LanguageModel,
    document: &str,
    question: &str,
    history: &[HistoryEntry],
) -> Result<Answer, ActionError> {
    require("document", document)?;
    require("question", question)?;

    let request = GenerateRequest::new(
        prompt::answer_prompt(document, question, history),
        "document_answer",
        prompt::answer_schema(),
    );
    match generate_typed::<Answer>(model, &request).await {
        Ok(mut answer) => {
            // An empty reference string carries no information.
            if answer.reference.as_deref().is_some_and(|r| r.trim().is_empty()) {
                answer.reference = None;
            }
            Ok(answer)
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "error asking question");
            Ok(Answer {
                answer: ANSWER_FALLBACK.to_string(),
                reference: None,
            })
        }
    }
}

/// Returns up to three questions, or an empty list if the model fails.
pub async fn generate_challenge_questions(
    model: &dyn LanguageModel,
    document: &str,
) -> Result<Vec<String>, ActionError> {
    require("document", document)?;

    let request = GenerateRequest::new(
        prompt::challenge_prompt(document),
        "challenge_questions",
        prompt::challenge_schema(),
    );
    match generate_typed::<ChallengeQuestions>(model, &request).await {
        Ok(out) => {
            let questions = normalize_questions(out.questions);
            info!(count = questions.len(), "generated challenge questions");
            Ok(questions)
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "error generating challenge questions");
            Ok(Vec::new())
        }
    }
}

fn normalize_questions(raw: Vec<String>) -> Vec<String> {
    let mut out = Vec::new();
    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if entry.contains('\n') {
            let numbered = prompt::parse_numbered_questions(entry);
            if !numbered.is_empty() {
                out.extend(numbered);
                continue;
            }
        }
        out.push(entry.to_string());
    }
    out.truncate(CHALLENGE_COUNT);
    out
}

pub async fn evaluate_answer(
    model: &dyn LanguageModel,
    document: &str,
    question: &str,
    answer: &str,
) -> Result<Evaluation, ActionError> {
    require("document", document)?;
    require("question", question)?;
    require("answer", answer)?;

    let request = GenerateRequest::new(
        prompt::evaluate_prompt(document, question, answer),
        "answer_evaluation",
        prompt::evaluate_schema(),
    );
    match generate_typed::<Evaluation>(model, &request).await {
        Ok(evaluation) => Ok(evaluation),
        Err(e) => {
            error!(error = %format!("{:#}", e), "error evaluating answer");
            Ok(Evaluation {
                is_correct: false,
                feedback: EVALUATION_FALLBACK.to_string(),
                reference: None,
            })
        }
    }
}
