//! TOML configuration.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:7340"
//! max_upload_bytes = 10485760
//!
//! [model]
//! provider = "openai"          # openai | ollama | disabled
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [chat]
//! max_history = 20
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL; provider-specific default when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    60
}

impl ModelConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

fn default_max_history() -> usize {
    20
}

impl Config {
    /// Defaults for every section; model provider disabled.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    match config.model.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown model provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    if config.model.is_enabled() && config.model.model.is_none() {
        anyhow::bail!(
            "model.model must be specified when provider is '{}'",
            config.model.provider
        );
    }

    if !(0.0..=2.0).contains(&config.model.temperature) {
        anyhow::bail!("model.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:7340");
        assert_eq!(cfg.model.provider, "disabled");
        assert_eq!(cfg.chat.max_history, 20);
        assert!(!cfg.model.is_enabled());
    }

    #[test]
    fn enabled_provider_requires_model() {
        let file = write_config("[model]\nprovider = \"openai\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("model.model"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let file = write_config("[model]\nprovider = \"gemini\"\nmodel = \"x\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown model provider"));
    }

    #[test]
    fn temperature_out_of_range_rejected() {
        let file = write_config(
            "[model]\nprovider = \"ollama\"\nmodel = \"llama3\"\ntemperature = 3.5\n",
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn zero_upload_limit_rejected() {
        let file = write_config("[server]\nmax_upload_bytes = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn full_config_parses() {
        let file = write_config(
            r#"[server]
bind = "0.0.0.0:9000"

[model]
provider = "ollama"
model = "llama3.1"
url = "http://gpu-box:11434"
max_retries = 1

[chat]
max_history = 4
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.model.model.as_deref(), Some("llama3.1"));
        assert_eq!(cfg.model.url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(cfg.model.max_retries, 1);
        assert_eq!(cfg.chat.max_history, 4);
    }
}
