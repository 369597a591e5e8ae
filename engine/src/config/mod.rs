//! Configuration management
//!
//! This module handles loading, validation, and management of the Scout configuration.
//! Configuration is stored in TOML format at ~/.scout/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Model backend selection, per-call timeout, provider settings
//! - **research**: Connector concurrency cap, connector timeout, resolver strategy
//! - **qualification**: Copy-generation score threshold
//! - **connectors**: External data source endpoints
//! - **store**: Context store backend and default namespace
//!
//! Credentials never live in this file. They are read from the environment
//! or the OS keychain (see `crate::secrets`).
//!
//! # Examples
//!
//! ```no_run
//! use scout_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Threshold: {}", config.qualification.threshold);
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Research execution settings
    #[serde(default)]
    pub research: ResearchConfig,

    /// Qualification settings
    #[serde(default)]
    pub qualification: QualificationConfig,

    /// Connector endpoints
    #[serde(default)]
    pub connectors: ConnectorsConfig,

    /// Context store settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (openai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Per-call timeout for model requests (seconds)
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model used for planning, resolution and scoring
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Model used for outreach copy
    #[serde(default = "default_openai_copy_model")]
    pub copy_model: String,
    // Note: API key read from OPENAI_API_KEY or the OS keychain
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Research execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum simultaneous outstanding connector invocations
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    /// Per-invocation connector timeout (seconds)
    #[serde(default = "default_connector_timeout")]
    pub connector_timeout_secs: u64,

    /// Subtask resolution strategy: "model" or "keyword"
    #[serde(default = "default_resolver")]
    pub resolver: String,
}

/// Qualification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationConfig {
    /// Minimum score (inclusive) that triggers copy generation
    #[serde(default = "default_threshold")]
    pub threshold: u8,
}

/// Connector endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorsConfig {
    /// RapidAPI host serving person profiles and posts
    #[serde(default = "default_profile_host")]
    pub rapidapi_profile_host: String,

    /// RapidAPI host serving company pages and company posts
    #[serde(default = "default_company_host")]
    pub rapidapi_company_host: String,

    /// Override for the RapidAPI scheme+host, used to point connectors at a mock server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rapidapi_base_url: Option<String>,

    /// NewsAPI base URL
    #[serde(default = "default_newsapi_base_url")]
    pub newsapi_base_url: String,
}

/// Context store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend: "sqlite" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Namespace shared by every run that does not name one.
    /// Unset means each run gets a fresh namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.scout")
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model_timeout() -> u64 {
    60
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_copy_model() -> String {
    "gpt-4o".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_max_concurrent_calls() -> usize {
    8
}

fn default_connector_timeout() -> u64 {
    20
}

fn default_resolver() -> String {
    "model".to_string()
}

fn default_threshold() -> u8 {
    50
}

fn default_profile_host() -> String {
    "fresh-linkedin-scraper-api.p.rapidapi.com".to_string()
}

fn default_company_host() -> String {
    "linkedin-data-api.p.rapidapi.com".to_string()
}

fn default_newsapi_base_url() -> String {
    "https://newsapi.org/v2".to_string()
}

fn default_store_backend() -> String {
    "sqlite".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            timeout_secs: default_model_timeout(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            copy_model: default_openai_copy_model(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: default_max_concurrent_calls(),
            connector_timeout_secs: default_connector_timeout(),
            resolver: default_resolver(),
        }
    }
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

impl Default for ConnectorsConfig {
    fn default() -> Self {
        Self {
            rapidapi_profile_host: default_profile_host(),
            rapidapi_company_host: default_company_host(),
            rapidapi_base_url: None,
            newsapi_base_url: default_newsapi_base_url(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            namespace: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            research: ResearchConfig::default(),
            qualification: QualificationConfig::default(),
            connectors: ConnectorsConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.scout/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the file cannot be read or parsed,
    /// or if validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps the portable ~ form
        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.scout/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".scout").join("config.toml"))
    }

    /// Path of the SQLite context database inside the data directory
    pub fn context_db_path(&self) -> PathBuf {
        self.core.data_dir.join("context.db")
    }

    /// Validate and process configuration
    ///
    /// Checks enumerated values and numeric bounds, then expands `~` in the
    /// data directory. The directory itself is created lazily by the store.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        let valid_resolvers = ["model", "keyword"];
        if !valid_resolvers.contains(&self.research.resolver.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid resolver '{}'. Must be one of: {}",
                self.research.resolver,
                valid_resolvers.join(", ")
            )));
        }

        let valid_backends = ["sqlite", "memory"];
        if !valid_backends.contains(&self.store.backend.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid store backend '{}'. Must be one of: {}",
                self.store.backend,
                valid_backends.join(", ")
            )));
        }

        if self.qualification.threshold > 100 {
            return Err(EngineError::Config(
                "qualification.threshold must be between 0 and 100".to_string(),
            ));
        }

        if self.research.max_concurrent_calls == 0 {
            return Err(EngineError::Config(
                "research.max_concurrent_calls must be at least 1".to_string(),
            ));
        }

        if self.research.connector_timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        if let Some(namespace) = &self.store.namespace {
            validate_namespace(namespace)?;
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        Ok(())
    }
}

/// Namespaces become part of storage keys and must be simple identifiers
pub fn validate_namespace(namespace: &str) -> Result<(), EngineError> {
    let ok = !namespace.is_empty()
        && namespace.len() <= 64
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');

    if ok {
        Ok(())
    } else {
        Err(EngineError::Config(format!(
            "Invalid namespace '{}'. Use 1-64 characters from [A-Za-z0-9._-]",
            namespace
        )))
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
