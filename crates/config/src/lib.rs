//! Configuration loading and validation for Questkeeper.
//!
//! Loads configuration from `~/.questkeeper/config.toml` with environment
//! variable overrides. All values are fixed for the lifetime of the process;
//! there is no runtime mutation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default system prompt — the campaign-management workflow the agent
/// follows. Overridable via `system_prompt` in the config file.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI assistant managing quests and NPCs in a tabletop RPG campaign.

CRITICAL WORKFLOW:

1. **SEARCH FIRST (if not already done)**
   - Before creating an entity, check if it exists
   - Use list_npcs with SIMPLE search terms
   - "Han the Hunter" -> search "han"
   - "Bob the Bartender" -> search "bob"

2. **INTERPRET SEARCH RESULTS**
   - If count > 0: Entity exists, use its ID
   - If count = 0: Entity does NOT exist, CREATE IT IMMEDIATELY
   - Do NOT search again if count = 0

3. **AFTER CREATING**
   - Move to next entity or create quest
   - Do NOT re-search for the entity you just created

4. **ONE ENTITY PER TYPE**
   - Never create the same entity twice

5. **COMPLETE THE TASK**
   - Execute ALL steps needed
   - If you find multiple entities (e.g., multiple quest IDs), fetch ALL of them
   - Don't stop after the first result
   - Create all necessary relationships
   - Then give final answer summarizing EVERYTHING you found

TOOLS - USE ONE AT A TIME:
- Call one tool, wait for result
- Decide next action based on result
- Continue until complete

Available tools will be shown in each request."#;

/// The root configuration structure.
///
/// Maps directly to `~/.questkeeper/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The Ollama model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// The Ollama endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Sampling temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Context window size passed to the model
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    /// Maximum model/tool iterations per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Override the built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_model() -> String {
    "qwen2.5:32b-instruct-q4_K_M".into()
}
fn default_endpoint() -> String {
    "http://localhost:11434".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_num_ctx() -> u32 {
    8192
}
fn default_max_iterations() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    AppConfig::config_dir()
        .join("quest.db")
        .to_string_lossy()
        .into_owned()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.questkeeper/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `QUESTKEEPER_MODEL`
    /// - `QUESTKEEPER_ENDPOINT`
    /// - `QUESTKEEPER_DB`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(model) = std::env::var("QUESTKEEPER_MODEL") {
            config.model = model;
        }
        if let Ok(endpoint) = std::env::var("QUESTKEEPER_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(db) = std::env::var("QUESTKEEPER_DB") {
            config.database.path = db;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".questkeeper")
    }

    /// The effective system prompt: the configured override, or the built-in
    /// campaign prompt.
    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.num_ctx == 0 {
            return Err(ConfigError::ValidationError(
                "num_ctx must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            num_ctx: default_num_ctx(),
            max_iterations: default_max_iterations(),
            system_prompt: None,
            database: DatabaseConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
