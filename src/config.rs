use crate::error::{AppError, Result};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub storage: StorageSection,
    pub invoice: InvoiceSection,
}

/// Which generative backend the normalizer and extractor talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    Gemini,
    /// OpenAI-compatible local server, no key needed.
    Ollama,
    /// OpenAI-compatible hosted API.
    Remote,
    /// No service at all: regex heuristics only.
    Heuristics,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub backend: LlmBackend,
    pub timeout_secs: u64,
    #[serde(default = "default_gemini")]
    pub gemini: EndpointConfig,
    #[serde(default = "default_ollama")]
    pub ollama: EndpointConfig,
    #[serde(default = "default_remote")]
    pub remote: EndpointConfig,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            timeout_secs: 30,
            gemini: default_gemini(),
            ollama: default_ollama(),
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the env var holding the API key. Keys never live in the file.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl EndpointConfig {
    /// Read the API key from the configured env var, if this endpoint needs one.
    pub fn api_key(&self) -> std::result::Result<Option<String>, crate::error::ServiceError> {
        match &self.api_key_env {
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| crate::error::ServiceError::MissingApiKey(var.clone())),
            None => Ok(None),
        }
    }
}

fn default_gemini() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        model: "gemini-1.5-pro-latest".to_string(),
        api_key_env: Some("GEMINI_API_KEY".to_string()),
    }
}

fn default_ollama() -> EndpointConfig {
    EndpointConfig {
        base_url: "http://localhost:11434/v1".to_string(),
        model: "qwen3:8b".to_string(),
        api_key_env: None,
    }
}

fn default_remote() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o-mini".to_string(),
        api_key_env: Some("LLM_API_KEY".to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub db_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: "store/transactions.db".to_string(),
        }
    }
}

/// Static parts of the rendered invoice: the issuing company and terms.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoiceSection {
    pub company_name: String,
    pub company_address: Vec<String>,
    pub invoice_prefix: String,
    pub due_days: i64,
    pub output_dir: PathBuf,
    pub terms: Vec<String>,
}

impl Default for InvoiceSection {
    fn default() -> Self {
        Self {
            company_name: "East Repair Inc.".to_string(),
            company_address: vec![
                "1912 Harvest Lane".to_string(),
                "New York, NY 12210".to_string(),
            ],
            invoice_prefix: "US".to_string(),
            due_days: 15,
            output_dir: PathBuf::from("invoices"),
            terms: vec![
                "TERMS & CONDITIONS".to_string(),
                "Payment is due within 15 days".to_string(),
                String::new(),
                "Thank you".to_string(),
                "Please make checks payable to: East Repair Inc.".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load `path` when given, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
