//! # DocuSense
//!
//! Document comprehension backed by a language model.
//!
//! Upload a text or PDF document, then get a short summary, ask free-form
//! questions with conversation history, or take a three-question
//! comprehension challenge with graded answers. The model does the reading;
//! this crate handles extraction, prompts, session state, and transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────────┐
//! │ Upload   │──▶│ Extract  │──▶│  Session   │──▶│   Actions    │
//! │ txt/pdf  │   │ txt/pdf  │   │  (memory)  │   │ + prompts    │
//! └──────────┘   └──────────┘   └───────────┘   └──────┬───────┘
//!                                                      ▼
//!                                              ┌──────────────┐
//!                                              │ LanguageModel │
//!                                              │ OpenAI/Ollama │
//!                                              └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsense summarize report.pdf
//! docsense ask report.pdf "What is the main finding?"
//! docsense chat notes.txt
//! docsense challenge notes.txt --interactive
//! docsense serve                       # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Text and PDF extraction |
//! | [`prompt`] | Prompt templates and output schemas |
//! | [`llm`] | Language-model provider abstraction |
//! | [`actions`] | Summarize, ask, challenge, evaluate |
//! | [`session`] | In-memory session store |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command implementations |

pub mod actions;
pub mod commands;
pub mod config;
pub mod extract;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod server;
pub mod session;
