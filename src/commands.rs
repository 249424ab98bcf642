//! Terminal front-end for the document actions.
//!
//! Each `run_*` function backs one `docsense` subcommand. The interactive
//! loops take their input and output streams as parameters so they can be
//! driven from tests.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::actions;
use crate::config::Config;
use crate::extract;
use crate::llm::LanguageModel;
use crate::models::{Document, Evaluation, HistoryEntry, Role};

/// Reads and extracts a document from disk.
pub fn load_document(path: &Path, config: &Config) -> Result<Document> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let (content_type, content) =
        extract::extract_upload(&name, None, &bytes, config.server.max_upload_bytes)
            .with_context(|| format!("Failed to extract text from {}", path.display()))?;

    Ok(Document {
        name,
        content_type: content_type.to_string(),
        content,
    })
}

pub fn run_extract(path: &Path, config: &Config) -> Result<()> {
    let doc = load_document(path, config)?;
    println!("{}", doc.content);
    Ok(())
}

pub async fn run_summarize(model: &dyn LanguageModel, path: &Path, config: &Config) -> Result<()> {
    let doc = load_document(path, config)?;
    let out = actions::summarize(model, &doc.content).await?;
    println!("{}", out.summary);
    Ok(())
}

pub async fn run_ask(
    model: &dyn LanguageModel,
    path: &Path,
    question: &str,
    config: &Config,
) -> Result<()> {
    let doc = load_document(path, config)?;
    let answer = actions::ask(model, &doc.content, question, &[]).await?;
    println!("{}", answer.answer);
    if let Some(reference) = answer.reference {
        println!("\nReference: {}", reference);
    }
    Ok(())
}

pub async fn run_evaluate(
    model: &dyn LanguageModel,
    path: &Path,
    question: &str,
    answer: &str,
    config: &Config,
) -> Result<()> {
    let doc = load_document(path, config)?;
    let eval = actions::evaluate_answer(model, &doc.content, question, answer).await?;
    print_evaluation(&mut std::io::stdout(), &eval)?;
    Ok(())
}

/// Interactive Q&A over one document.
///
/// `/reset` clears the conversation, `/quit` (or end of input) exits.
pub async fn chat_loop<R, W>(
    model: &dyn LanguageModel,
    doc: &Document,
    max_history: usize,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut history: Vec<HistoryEntry> = Vec::new();
    let mut lines = input.lines();

    writeln!(out, "Chatting about {}. /reset to start over, /quit to exit.", doc.name)?;
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        match question {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                history.clear();
                writeln!(out, "Conversation cleared.")?;
                continue;
            }
            _ => {}
        }

        let skip = history.len().saturating_sub(max_history);
        let answer = actions::ask(model, &doc.content, question, &history[skip..]).await?;
        writeln!(out, "{}", answer.answer)?;
        if let Some(reference) = &answer.reference {
            writeln!(out, "  Reference: {}", reference)?;
        }

        history.push(HistoryEntry {
            role: Role::User,
            content: question.to_string(),
        });
        history.push(HistoryEntry {
            role: Role::Ai,
            content: answer.answer,
        });
    }
    Ok(())
}

/// Prints the challenge questions, optionally quizzing the user on each one.
///
/// Returns the number of answers judged correct.
pub async fn challenge_loop<R, W>(
    model: &dyn LanguageModel,
    doc: &Document,
    interactive: bool,
    input: R,
    out: &mut W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let questions = actions::generate_challenge_questions(model, &doc.content).await?;
    if questions.is_empty() {
        writeln!(out, "Could not generate challenge questions for this document.")?;
        return Ok(0);
    }

    if !interactive {
        for q in &questions {
            writeln!(out, "{}", q)?;
        }
        return Ok(0);
    }

    let mut lines = input.lines();
    let mut correct = 0;
    for q in &questions {
        writeln!(out, "\n{}", q)?;
        write!(out, "Your answer: ")?;
        out.flush()?;
        let Some(answer) = lines.next_line().await? else {
            break;
        };
        let answer = answer.trim();
        if answer.is_empty() {
            writeln!(out, "Skipped.")?;
            continue;
        }
        let eval = actions::evaluate_answer(model, &doc.content, q, answer).await?;
        if eval.is_correct {
            correct += 1;
        }
        print_evaluation(out, &eval)?;
    }
    writeln!(out, "\nScore: {}/{}", correct, questions.len())?;
    Ok(correct)
}

fn print_evaluation<W: Write>(out: &mut W, eval: &Evaluation) -> Result<()> {
    let verdict = if eval.is_correct { "Correct" } else { "Incorrect" };
    writeln!(out, "{}: {}", verdict, eval.feedback)?;
    if let Some(reference) = &eval.reference {
        writeln!(out, "  Reference: {}", reference)?;
    }
    Ok(())
}
