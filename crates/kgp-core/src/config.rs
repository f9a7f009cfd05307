//! KGP Configuration Management
//!
//! Handles configuration from environment variables, TOML config files,
//! and command-line arguments with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Evaluation input/output paths
    pub eval: EvalConfig,

    /// Extraction pipeline settings
    pub pipeline: PipelineConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Evaluation
        if let Ok(path) = std::env::var("GOLD_PATH") {
            config.eval.gold_path = path.into();
        }
        if let Ok(path) = std::env::var("PRED_ARTIFACTS_PATH") {
            config.eval.pred_artifacts_path = path.into();
        }
        if let Ok(path) = std::env::var("EVAL_OUT_PATH") {
            config.eval.out_path = path.into();
        }

        // Pipeline
        if let Ok(dir) = std::env::var("PIPELINE_OUTDIR") {
            config.pipeline.output_dir = dir.into();
        }
        if let Ok(flag) = std::env::var("USE_LLM") {
            config.pipeline.use_llm = parse_bool("USE_LLM", &flag)?;
        }
        if let Ok(path) = std::env::var("PROMPT_RE_PATH") {
            config.pipeline.prompt_re_path = Some(path.into());
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                config.llm.openai_api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.llm.openai_base_url = Some(url);
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.llm.model = model;
        }
        if let Ok(path) = std::env::var("LLM_LOG_PATH") {
            config.llm.log_path = path.into();
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        Ok(self.merge(Self::from_env()?))
    }

    /// Overlay `env_config` onto `self`, keeping values the environment left at default
    fn merge(mut self, env_config: Self) -> Self {
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.eval.gold_path != defaults.eval.gold_path {
            self.eval.gold_path = env_config.eval.gold_path;
        }
        if env_config.eval.pred_artifacts_path != defaults.eval.pred_artifacts_path {
            self.eval.pred_artifacts_path = env_config.eval.pred_artifacts_path;
        }
        if env_config.eval.out_path != defaults.eval.out_path {
            self.eval.out_path = env_config.eval.out_path;
        }
        if env_config.pipeline.output_dir != defaults.pipeline.output_dir {
            self.pipeline.output_dir = env_config.pipeline.output_dir;
        }
        if env_config.pipeline.use_llm {
            self.pipeline.use_llm = true;
        }
        if env_config.pipeline.prompt_re_path.is_some() {
            self.pipeline.prompt_re_path = env_config.pipeline.prompt_re_path;
        }
        if env_config.llm.provider != defaults.llm.provider {
            self.llm.provider = env_config.llm.provider;
        }
        if env_config.llm.openai_base_url.is_some() {
            self.llm.openai_base_url = env_config.llm.openai_base_url;
        }
        if env_config.llm.model != defaults.llm.model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.llm.log_path != defaults.llm.log_path {
            self.llm.log_path = env_config.llm.log_path;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }

        // Always use env for sensitive values
        if env_config.llm.openai_api_key.is_some() {
            self.llm.openai_api_key = env_config.llm.openai_api_key;
        }

        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Evaluation paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Gold corpus (JSON array of documents)
    pub gold_path: PathBuf,

    /// Pipeline artifacts holding `pred_relations` and `rule_personality`
    pub pred_artifacts_path: PathBuf,

    /// Where the evaluation report is written
    pub out_path: PathBuf,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            gold_path: PathBuf::from("data/synthetic_v1.json"),
            pred_artifacts_path: PathBuf::from("notebooks_output/pipeline_artifacts.json"),
            out_path: PathBuf::from("report/eval_report.json"),
        }
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory for per-document artifacts
    pub output_dir: PathBuf,

    /// Run the generative-model relation extractor per sentence
    pub use_llm: bool,

    /// Prompt template for relation extraction (must contain `{input_text}`)
    pub prompt_re_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("notebooks_output"),
            use_llm: false,
            prompt_re_path: None,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// OpenAI API key; without it every call is simulated
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// JSON array file receiving every prompt/response pair
    pub log_path: PathBuf,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            openai_api_key: None,
            openai_base_url: None,
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 800,
            temperature: 0.0,
            timeout_secs: 60,
            log_path: PathBuf::from("llm_session/raw_responses.json"),
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    /// Never call out; always use the simulator
    Simulated,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "simulated" | "simulator" => Ok(Self::Simulated),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
