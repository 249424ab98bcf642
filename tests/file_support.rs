//! Document extraction through the library, the HTTP upload, and the CLI.

mod common;

use base64::Engine;
use common::{pdf_with_pages, spawn_server, ScriptedModel};
use docusense::extract::{extract_text, extract_upload, ExtractError, MIME_PDF};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

fn docsense_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docsense");
    path
}

fn run_docsense(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(docsense_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docsense: {}", e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn pdf_pages_are_extracted_in_order() {
    let pdf = pdf_with_pages(&["Alpha page text", "Omega page text"]);
    let text = extract_text(&pdf, MIME_PDF).unwrap();
    let alpha = text.find("Alpha").expect("first page text");
    let omega = text.find("Omega").expect("second page text");
    assert!(alpha < omega, "pages out of order: {:?}", text);
}

#[test]
fn corrupt_pdf_is_an_error_not_a_panic() {
    let err = extract_upload("bad.pdf", None, b"not a valid pdf", 1024).unwrap_err();
    assert!(matches!(err, ExtractError::Pdf(_)), "got {:?}", err);
}

#[tokio::test]
async fn pdf_upload_over_http() {
    let server = spawn_server(Arc::new(ScriptedModel::new())).await;
    let pdf = pdf_with_pages(&["Photosynthesis converts light"]);

    let resp = server
        .client
        .post(server.url("/documents"))
        .json(&json!({
            "name": "biology.pdf",
            "contentType": "application/pdf",
            "content": base64::engine::general_purpose::STANDARD.encode(&pdf),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let session: Value = resp.json().await.unwrap();
    assert_eq!(session["document"]["contentType"], "application/pdf");
    assert!(session["document"]["content"]
        .as_str()
        .unwrap()
        .contains("Photosynthesis"));
}

#[test]
fn cli_extract_prints_text() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("notes.txt");
    fs::write(&doc, "Ferris is the Rust mascot.\n").unwrap();
    let missing_config = tmp.path().join("none.toml");

    let (stdout, stderr, ok) = run_docsense(&missing_config, &["extract", doc.to_str().unwrap()]);
    assert!(ok, "extract failed: {}", stderr);
    assert!(stdout.contains("Ferris is the Rust mascot."));
}

#[test]
fn cli_summarize_with_disabled_model_prints_fallback() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("notes.txt");
    fs::write(&doc, "Some content worth summarizing.").unwrap();
    let config = tmp.path().join("docsense.toml");
    fs::write(&config, "[model]\nprovider = \"disabled\"\n").unwrap();

    let (stdout, stderr, ok) = run_docsense(&config, &["summarize", doc.to_str().unwrap()]);
    assert!(ok, "summarize failed: {}", stderr);
    assert!(stdout.contains("Could not generate a summary for this document."));
}

#[test]
fn cli_rejects_unsupported_file() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("image.gif");
    fs::write(&doc, b"GIF89a").unwrap();

    let (_, stderr, ok) = run_docsense(&tmp.path().join("none.toml"), &["extract", doc.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("unsupported content-type"), "stderr: {}", stderr);
}

#[test]
fn cli_rejects_invalid_config() {
    let tmp = TempDir::new().unwrap();
    let doc = tmp.path().join("notes.txt");
    fs::write(&doc, "text").unwrap();
    let config = tmp.path().join("docsense.toml");
    fs::write(&config, "[model]\nprovider = \"openai\"\n").unwrap();

    let (_, stderr, ok) = run_docsense(&config, &["extract", doc.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("model.model"), "stderr: {}", stderr);
}
