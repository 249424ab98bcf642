//! Shared fixtures: a scripted language model and a server on an ephemeral port.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use docusense::config::Config;
use docusense::llm::{GenerateRequest, LanguageModel};
use docusense::server::{router, AppState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Returns canned JSON per schema name and records every prompt it sees.
///
/// Schemas with no canned response fail, which exercises the fallbacks.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<GenerateRequest>>,
    gate: Option<(String, Arc<Notify>)>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `schema_name`. The last queued response repeats.
    pub fn respond(self, schema_name: &str, value: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(schema_name.to_string())
            .or_default()
            .push(value);
        self
    }

    /// Makes calls for `schema_name` wait until `gate` is notified.
    pub fn gated(mut self, schema_name: &str, gate: Arc<Notify>) -> Self {
        self.gate = Some((schema_name.to_string(), gate));
        self
    }

    pub fn calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, schema_name: &str) -> Vec<GenerateRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.schema_name == schema_name)
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Value> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some((schema_name, gate)) = &self.gate {
            if *schema_name == request.schema_name {
                gate.notified().await;
            }
        }
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(&request.schema_name) {
            Some(queue) if queue.len() > 1 => Ok(queue.remove(0)),
            Some(queue) if queue.len() == 1 => Ok(queue[0].clone()),
            _ => bail!("no scripted response for {}", request.schema_name),
        }
    }
}

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub async fn spawn_server(model: Arc<ScriptedModel>) -> TestServer {
    spawn_server_with(Config::minimal(), model).await
}

pub async fn spawn_server_with(config: Config, model: Arc<ScriptedModel>) -> TestServer {
    let state = AppState::new(config, model);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        state,
    }
}

/// Builds a small PDF with one text line per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
