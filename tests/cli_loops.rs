//! Interactive chat and challenge loops driven with scripted input.

mod common;

use common::ScriptedModel;
use docusense::commands::{challenge_loop, chat_loop};
use docusense::models::Document;
use serde_json::json;

fn doc() -> Document {
    Document {
        name: "ferris.txt".to_string(),
        content_type: "text/plain".to_string(),
        content: "Ferris is a crab. Ferris is the unofficial Rust mascot.".to_string(),
    }
}

#[tokio::test]
async fn chat_keeps_history_and_resets() {
    let model = ScriptedModel::new().respond(
        "document_answer",
        json!({ "answer": "A crab.", "reference": "Ferris is a crab." }),
    );
    let input: &[u8] = b"What is Ferris?\n\nAnd whose mascot?\n/reset\nAgain?\n/quit\nignored\n";
    let mut out = Vec::new();

    chat_loop(&model, &doc(), 20, input, &mut out).await.unwrap();

    let calls = model.calls_for("document_answer");
    assert_eq!(calls.len(), 3);
    assert!(!calls[0].prompt.contains("User: What is Ferris?"));
    assert!(calls[1].prompt.contains("User: What is Ferris?\nYou: A crab."));
    // History was cleared by /reset.
    assert!(!calls[2].prompt.contains("conversation history"));

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Reference: Ferris is a crab."));
    assert!(text.contains("Conversation cleared."));
}

#[tokio::test]
async fn chat_trims_history_to_limit() {
    let model = ScriptedModel::new().respond("document_answer", json!({ "answer": "ok" }));
    let input: &[u8] = b"one\ntwo\nthree\n";
    let mut out = Vec::new();

    chat_loop(&model, &doc(), 2, input, &mut out).await.unwrap();

    let last = &model.calls_for("document_answer")[2].prompt;
    assert!(!last.contains("User: one"));
    assert!(last.contains("User: two\nYou: ok"));
}

#[tokio::test]
async fn challenge_lists_questions() {
    let model = ScriptedModel::new().respond(
        "challenge_questions",
        json!({ "questions": ["1. What is Ferris?\n2. Whose mascot?\n3. Is it official?"] }),
    );
    let mut out = Vec::new();

    let correct = challenge_loop(&model, &doc(), false, &b""[..], &mut out)
        .await
        .unwrap();
    assert_eq!(correct, 0);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        vec!["1. What is Ferris?", "2. Whose mascot?", "3. Is it official?"]
    );
    assert!(model.calls_for("answer_evaluation").is_empty());
}

#[tokio::test]
async fn interactive_challenge_scores_answers() {
    let model = ScriptedModel::new()
        .respond(
            "challenge_questions",
            json!({ "questions": ["1. What is Ferris?", "2. Whose mascot?", "3. Official?"] }),
        )
        .respond("answer_evaluation", json!({ "isCorrect": true, "feedback": "Yes." }))
        .respond("answer_evaluation", json!({ "isCorrect": false, "feedback": "No, it is unofficial." }));
    let input: &[u8] = b"a crab\n\nyes\n";
    let mut out = Vec::new();

    let correct = challenge_loop(&model, &doc(), true, input, &mut out)
        .await
        .unwrap();
    assert_eq!(correct, 1);

    // The blank answer is skipped, so only two evaluations run.
    assert_eq!(model.calls_for("answer_evaluation").len(), 2);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Correct: Yes."));
    assert!(text.contains("Skipped."));
    assert!(text.contains("Incorrect: No, it is unofficial."));
    assert!(text.contains("Score: 1/3"));
}

#[tokio::test]
async fn challenge_failure_reports_and_returns_zero() {
    let model = ScriptedModel::new();
    let mut out = Vec::new();
    let correct = challenge_loop(&model, &doc(), true, &b"x\n"[..], &mut out)
        .await
        .unwrap();
    assert_eq!(correct, 0);
    assert!(String::from_utf8(out)
        .unwrap()
        .contains("Could not generate challenge questions"));
}
