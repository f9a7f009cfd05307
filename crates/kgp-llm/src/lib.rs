//! KGP LLM - Prompted relation extraction with a generative model
//!
//! A call reads a prompt template, substitutes the input text, asks the
//! configured model (or the offline simulator), logs the exchange and
//! checks that any quoted evidence really occurs in the input.

pub mod openai;
pub mod session;
pub mod simulator;

pub use openai::OpenAiClient;
pub use session::{LogEntry, SessionLog};
pub use simulator::simulate_response;

use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use kgp_core::{KgpError, LlmClient, LlmConfig, LlmProvider, Result};

/// Placeholder replaced by the input text
pub const INPUT_PLACEHOLDER: &str = "{input_text}";

// ============================================================================
// Responses
// ============================================================================

/// Parsed model response
///
/// Arbitrary JSON as returned by the model; non-JSON text is wrapped as
/// `{"text": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LlmResponse(pub Value);

/// One extracted relation in a response's `extracted` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmExtraction {
    #[serde(default)]
    pub subj: Option<String>,
    #[serde(default)]
    pub pred: Option<String>,
    #[serde(default)]
    pub obj: Option<String>,
    #[serde(default)]
    pub evidence: Evidence,
}

/// Evidence given either as one string or as a list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    #[default]
    None,
    One(String),
    Many(Vec<Option<String>>),
}

impl Evidence {
    /// Non-null evidence strings
    pub fn items(&self) -> Vec<&str> {
        match self {
            Self::None => Vec::new(),
            Self::One(s) => vec![s.as_str()],
            Self::Many(v) => v.iter().flatten().map(String::as_str).collect(),
        }
    }

    /// First evidence string, if any
    pub fn first(&self) -> Option<&str> {
        self.items().into_iter().next()
    }
}

impl LlmResponse {
    /// Items of the `extracted` list that have the expected shape
    pub fn extracted(&self) -> Vec<LlmExtraction> {
        self.0
            .get("extracted")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_simulated(&self) -> bool {
        self.0.get("simulated").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Fail on the first evidence string missing from `input_text`
    pub fn validate_evidence(&self, input_text: &str) -> Result<()> {
        for item in self.extracted() {
            for ev in item.evidence.items() {
                if !input_text.contains(ev) {
                    return Err(KgpError::EvidenceNotFound(ev.to_string()));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Caller
// ============================================================================

/// Runs prompted calls against a live client or the simulator
pub struct LlmCaller {
    client: Option<Arc<dyn LlmClient>>,
    log: SessionLog,
    validate_evidence: bool,
}

impl LlmCaller {
    /// Live OpenAI client when the provider is OpenAI and a key is configured,
    /// simulator otherwise
    pub fn from_config(config: &LlmConfig) -> Self {
        let client: Option<Arc<dyn LlmClient>> = match config.provider {
            LlmProvider::OpenAI => match OpenAiClient::from_config(config) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::info!("Using LLM simulator: {e}");
                    None
                }
            },
            LlmProvider::Simulated => None,
        };

        Self {
            client,
            log: SessionLog::new(&config.log_path),
            validate_evidence: true,
        }
    }

    /// Simulator-only caller logging to `log_path`
    pub fn simulated(log_path: impl AsRef<Path>) -> Self {
        Self {
            client: None,
            log: SessionLog::new(log_path.as_ref()),
            validate_evidence: true,
        }
    }

    /// Use a specific client for live calls
    pub fn with_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_evidence_validation(mut self, validate: bool) -> Self {
        self.validate_evidence = validate;
        self
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.log
    }

    /// Call with a plain text input
    pub async fn call_text(
        &self,
        prompt_path: impl AsRef<Path>,
        text: &str,
    ) -> Result<LlmResponse> {
        self.call(prompt_path, &json!({ "text": text })).await
    }

    /// Call with a JSON input
    ///
    /// The input's `text` field is substituted into the template; without
    /// one, the whole input is substituted as JSON.
    pub async fn call(
        &self,
        prompt_path: impl AsRef<Path>,
        input: &Value,
    ) -> Result<LlmResponse> {
        let prompt_path = prompt_path.as_ref();
        let template = tokio::fs::read_to_string(prompt_path)
            .await
            .map_err(|_| KgpError::PromptNotFound(prompt_path.to_path_buf()))?;

        let input_text = match input.get("text").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => input.to_string(),
        };
        let prompt = template.replace(INPUT_PLACEHOLDER, &input_text);

        let live = match &self.client {
            Some(client) => match client.generate(&prompt).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!("LLM call via {} failed, using simulator: {e}", client.name());
                    None
                }
            },
            None => None,
        };

        let simulated = live.is_none();
        let (response_text, parsed) = match live {
            Some(text) => {
                let parsed: Value =
                    serde_json::from_str(&text).unwrap_or_else(|_| json!({ "text": text }));
                (text, parsed)
            }
            None => {
                let parsed = simulate_response(&input_text);
                (parsed.to_string(), parsed)
            }
        };

        let entry = LogEntry {
            prompt_path: prompt_path.display().to_string(),
            prompt,
            response_text,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            simulated,
        };
        if let Err(e) = self.log.append(entry).await {
            tracing::warn!("Failed to append to session log {}: {e}", self.log.path().display());
        }

        let response = LlmResponse(parsed);
        if self.validate_evidence {
            response.validate_evidence(&input_text)?;
        }
        Ok(response)
    }
}

/// One-shot call using a caller built from `config`
pub async fn call_llm(
    config: &LlmConfig,
    prompt_path: impl AsRef<Path>,
    input: &Value,
) -> Result<LlmResponse> {
    LlmCaller::from_config(config).call(prompt_path, input).await
}
