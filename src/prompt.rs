//! Prompt templates for the four model-backed actions.
//!
//! Every function here is pure string construction; the JSON output schemas
//! the model must satisfy live next to the templates so the two cannot drift.

use serde_json::{json, Value};

use crate::models::{HistoryEntry, Role};

/// Number of challenge questions requested from the model.
pub const CHALLENGE_COUNT: usize = 3;

pub fn summary_prompt(document: &str) -> String {
    format!(
        "Your goal is to help the user quickly grasp the main points of their document.

Please write a clear, concise, and easy-to-read summary of the following document content. \
The summary should be no more than 150 words. Focus on the key information and takeaways.

Document Content:
---
{document}
---"
    )
}

pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "A clear, concise summary of the document (around 150 words)."
            }
        },
        "required": ["summary"],
        "additionalProperties": false
    })
}

/// Renders prior turns as `User: …` / `You: …` lines, oldest first.
pub fn render_history(history: &[HistoryEntry]) -> String {
    history
        .iter()
        .map(|entry| match entry.role {
            Role::User => format!("User: {}", entry.content),
            Role::Ai => format!("You: {}", entry.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn answer_prompt(document: &str, question: &str, history: &[HistoryEntry]) -> String {
    let mut out = String::from(
        "You are DocuSense AI, a friendly and helpful assistant designed to help users understand documents.

Your goal is to answer the user's questions based on the provided document content. \
Use a warm and conversational tone.

Here is the document content:
---
",
    );
    out.push_str(document);
    out.push_str("\n---\n\n");

    if !history.is_empty() {
        out.push_str(
            "Here is our conversation history so far. \
Use it to understand the context of the user's new question.\n---\n",
        );
        out.push_str(&render_history(history));
        out.push_str("\n---\n\n");
    }

    out.push_str(
        "Based on our conversation and the document, please answer the following question. \
If the answer is found in the text, provide a specific reference or quote. \
If you truly cannot find an answer, politely say so.\n\n",
    );
    out.push_str("User's Question: ");
    out.push_str(question);
    out.push_str("\n\nYour Answer:");
    out
}

pub fn answer_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "answer": {
                "type": "string",
                "description": "The answer to the question, based on the document content and conversation history."
            },
            "reference": {
                "type": "string",
                "description": "A specific quote or reference from the document that supports the answer."
            }
        },
        "required": ["answer"]
    })
}

pub fn challenge_prompt(document: &str) -> String {
    format!(
        "You are a creative quiz master. Your task is to generate exactly {CHALLENGE_COUNT} \
thought-provoking questions from the document provided.

The questions should:
- Be answerable only with the information in the document.
- Encourage critical thinking, logic, or deep comprehension.
- Be phrased clearly and concisely.

Do not provide answers.

Document Content:
---
{document}
---"
    )
}

pub fn challenge_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "An array of exactly three challenge questions."
            }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

pub fn evaluate_prompt(document: &str, question: &str, answer: &str) -> String {
    format!(
        "You are an expert evaluator assessing user answers to questions about a document.

Document Content: {document}
Question: {question}
Answer: {answer}

Determine if the answer is correct based on the document content.
Provide feedback on the answer, including specific references from the document for justification.
If the answer is incorrect or incomplete, explain why and provide the correct information from the document.
Only include a direct quote from the document if it is necessary to explain the answer.

Respond with an object containing:
- \"isCorrect\": true or false,
- \"feedback\": explanation of why the answer is correct or incorrect, with references,
- \"reference\": paragraph number or section title, only if strictly necessary."
    )
}

pub fn evaluate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "isCorrect": {
                "type": "boolean",
                "description": "Whether the answer is correct or not."
            },
            "feedback": {
                "type": "string",
                "description": "The feedback on the answer, including specific references from the document for justification."
            },
            "reference": {
                "type": "string",
                "description": "The reference (e.g., paragraph number) that justifies the answer. Only include if strictly necessary."
            }
        },
        "required": ["isCorrect", "feedback"]
    })
}

/// Keeps non-blank lines that start with a digit followed by `.`.
///
/// Some models ignore the array schema and answer with a single numbered
/// list; this recovers the individual questions from it.
pub fn parse_numbered_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let mut chars = line.chars();
            matches!(
                (chars.next(), chars.next()),
                (Some(d), Some('.')) if d.is_ascii_digit()
            )
        })
        .map(str::to_string)
        .collect()
}
