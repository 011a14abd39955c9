use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the processed-file state file inside `state_dir`
pub const STATE_FILE_NAME: &str = "processed_files.json";

/// Default embedding service: a local Ollama instance
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Main configuration structure
///
/// Passed explicitly to every component so that tests (and multiple
/// deployments on one host) can point at distinct storage locations.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ragindex: RagindexConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

/// Storage locations and process settings
#[derive(Debug, Clone, Deserialize)]
pub struct RagindexConfig {
    /// Flat folder of source documents (lectures, handouts).
    pub data_dir: PathBuf,
    /// Holds the processed-file state, the index artifacts and the commit journal.
    pub state_dir: PathBuf,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Embeddings configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    /// `"ollama"` or `"openai"`
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Server root. Left at the Ollama default with the openai provider,
    /// `https://api.openai.com` is used instead.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Only read for the openai provider.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Embedded once on cold start to learn the vector dimensionality.
    #[serde(default = "default_probe_text")]
    pub probe_text: String,
}

/// Chunking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_merge_peers")]
    pub merge_peers: bool,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            probe_text: default_probe_text(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            merge_peers: default_merge_peers(),
        }
    }
}

fn default_index_name() -> String {
    "knowledge_base".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "bge-m3".to_string()
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_max_retries() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_probe_text() -> String {
    "test".to_string()
}

fn default_max_tokens() -> usize {
    500
}

fn default_merge_peers() -> bool {
    true
}

impl Config {
    /// Build a configuration with default embedding and chunking settings.
    pub fn new(data_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            ragindex: RagindexConfig {
                data_dir: data_dir.into(),
                state_dir: state_dir.into(),
                index_name: default_index_name(),
                log_level: default_log_level(),
            },
            embeddings: EmbeddingsConfig::default(),
            chunking: ChunkingConfig::default(),
        }
    }

    /// Load configuration from file
    ///
    /// Looks for config file in this order:
    /// 1. Path specified in RAGINDEX_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env may define RAGINDEX_CONFIG itself
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RAGINDEX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    ///
    /// Loads environment variables from .env file (if present) before parsing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// The data directory is deliberately not required to exist: an absent
    /// source folder is reported by discovery as "nothing to update".
    pub fn validate(&self) -> Result<()> {
        let name = &self.ragindex.index_name;
        if name.trim().is_empty() {
            anyhow::bail!("ragindex.index_name must not be empty");
        }
        if name.contains('/') || name.contains('\\') {
            anyhow::bail!("ragindex.index_name must not contain path separators: {}", name);
        }

        if self.ragindex.state_dir.as_os_str().is_empty() {
            anyhow::bail!("ragindex.state_dir must not be empty");
        }

        match self.embeddings.provider.as_str() {
            "ollama" => {}
            "openai" => {
                std::env::var(&self.embeddings.api_key_env).with_context(|| {
                    format!(
                        "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                        self.embeddings.api_key_env
                    )
                })?;
            }
            other => anyhow::bail!(
                "embeddings.provider must be \"ollama\" or \"openai\", got \"{}\"",
                other
            ),
        }

        if self.embeddings.base_url.trim().is_empty() {
            anyhow::bail!("embeddings.base_url must not be empty");
        }

        if self.embeddings.batch_size == 0 {
            anyhow::bail!("embeddings.batch_size must be greater than 0");
        }

        if self.chunking.max_tokens == 0 {
            anyhow::bail!("chunking.max_tokens must be greater than 0");
        }

        Ok(())
    }

    /// Source documents folder
    pub fn data_dir(&self) -> &Path {
        &self.ragindex.data_dir
    }

    /// Directory holding all durable pipeline state
    pub fn state_dir(&self) -> &Path {
        &self.ragindex.state_dir
    }

    /// Path of the processed-file state file
    pub fn state_file(&self) -> PathBuf {
        self.ragindex.state_dir.join(STATE_FILE_NAME)
    }

    /// Name under which the index artifacts are stored
    pub fn index_name(&self) -> &str {
        &self.ragindex.index_name
    }
}
