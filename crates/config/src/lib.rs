//! Configuration loading, validation, and management for roundtable.
//!
//! Loads configuration from `roundtable.toml` in the working directory with
//! environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "roundtable.toml";

/// The root configuration structure.
///
/// Maps directly to `roundtable.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default completion provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model (the deployment name for Azure)
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Turn loop and termination settings
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Artifact extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Publication settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// The cast, in speaking order
    #[serde(default = "default_personas")]
    pub personas: Vec<PersonaConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("conversation", &self.conversation)
            .field("extraction", &self.extraction)
            .field("publish", &self.publish)
            .field("personas", &self.personas)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL, or the resource endpoint for Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Azure `api-version` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Hard ceiling on participant turns
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Termination ceiling on recorded messages (seed included)
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Requester keyword that ends the conversation (case-insensitive)
    #[serde(default = "default_approval_keyword")]
    pub approval_keyword: String,

    /// Participant phrase that asks the requester for approval (case-insensitive)
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,

    /// Turns to let pass before scanning new messages for an artifact
    #[serde(default = "default_warmup_turns")]
    pub warmup_turns: usize,

    /// Minimum discussion depth requested in the seed prompt (0 = no requirement)
    #[serde(default = "default_min_discussion_turns")]
    pub min_discussion_turns: usize,

    /// Stop the loop as soon as a new message carries a valid artifact
    #[serde(default = "default_true")]
    pub stop_on_artifact: bool,

    /// Lines appended to the seed prompt to shape the workflow
    #[serde(default = "default_workflow_instructions")]
    pub workflow_instructions: Vec<String>,
}

fn default_max_turns() -> usize {
    30
}
fn default_max_messages() -> usize {
    40
}
fn default_approval_keyword() -> String {
    "APPROVED".into()
}
fn default_ready_marker() -> String {
    "READY FOR USER APPROVAL".into()
}
fn default_warmup_turns() -> usize {
    3
}
fn default_min_discussion_turns() -> usize {
    6
}
fn default_workflow_instructions() -> Vec<String> {
    vec![
        "The final deliverable is one complete, self-contained HTML document with inline CSS and JavaScript, placed in a single ```html code block.".into(),
        "The ProductOwner reviews the result against every requirement and says READY FOR USER APPROVAL once nothing is missing.".into(),
    ]
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_messages: default_max_messages(),
            approval_keyword: default_approval_keyword(),
            ready_marker: default_ready_marker(),
            warmup_turns: default_warmup_turns(),
            min_discussion_turns: default_min_discussion_turns(),
            stop_on_artifact: true,
            workflow_instructions: default_workflow_instructions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Shortest accepted artifact, in characters
    #[serde(default = "default_min_artifact_chars")]
    pub min_artifact_chars: usize,

    /// Persona responsible for producing the artifact
    #[serde(default = "default_artifact_author")]
    pub artifact_author: String,

    /// Whether to send one directed request when nothing was found
    #[serde(default = "default_true")]
    pub last_resort: bool,

    /// Text of the directed request; `{author}` is replaced by the persona name
    #[serde(default = "default_directed_request")]
    pub directed_request: String,
}

fn default_min_artifact_chars() -> usize {
    200
}
fn default_artifact_author() -> String {
    "SoftwareEngineer".into()
}
fn default_directed_request() -> String {
    "{author}, please provide the complete application now as a single self-contained HTML document inside one ```html code block.".into()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_artifact_chars: default_min_artifact_chars(),
            artifact_author: default_artifact_author(),
            last_resort: true,
            directed_request: default_directed_request(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Where the artifact is written, relative to the working directory
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Branch to push; `HEAD` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Stage every change in the working tree instead of just the artifact
    #[serde(default)]
    pub stage_all: bool,

    #[serde(default = "default_commit_prefix")]
    pub commit_prefix: String,

    #[serde(default = "default_true")]
    pub open_viewer: bool,

    /// Only publish runs whose final state carries the approval keyword
    #[serde(default)]
    pub require_approval: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("index.html")
}
fn default_remote() -> String {
    "origin".into()
}
fn default_commit_prefix() -> String {
    "Publish".into()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_path: default_output_path(),
            remote: default_remote(),
            branch: None,
            stage_all: false,
            commit_prefix: default_commit_prefix(),
            open_viewer: true,
            require_approval: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// File holding the persona's instructions
    pub instructions_path: PathBuf,
}

impl PersonaConfig {
    fn new(name: &str, description: &str, path: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions_path: PathBuf::from(path),
        }
    }

    /// Instructions path resolved against `base_dir` when relative.
    pub fn resolve_path(&self, base_dir: &Path) -> PathBuf {
        if self.instructions_path.is_absolute() {
            self.instructions_path.clone()
        } else {
            base_dir.join(&self.instructions_path)
        }
    }
}

fn default_personas() -> Vec<PersonaConfig> {
    vec![
        PersonaConfig::new(
            "BusinessAnalyst",
            "Business Analyst persona for gathering and clarifying requirements.",
            "skills/BA/system_message.txt",
        ),
        PersonaConfig::new(
            "SoftwareEngineer",
            "Software Engineer persona to implement requested features and produce HTML/JS code.",
            "skills/SE/system_message.txt",
        ),
        PersonaConfig::new(
            "ProductOwner",
            "Product Owner persona for reviewing and ensuring all requirements are met.",
            "skills/PO/system_message.txt",
        ),
    ]
}

impl AppConfig {
    /// Load configuration from `roundtable.toml` in `workdir`, then apply
    /// environment variable overrides.
    ///
    /// API keys are taken from, in order:
    /// - `ROUNDTABLE_API_KEY`
    /// - `OPENAI_API_KEY`
    /// - `AZURE_OPENAI_API_KEY`
    pub fn load(workdir: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(&workdir.join(CONFIG_FILE), |key| std::env::var(key).ok())
    }

    /// Load from a specific path, resolving overrides through `env`.
    pub fn load_with_env(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no environment overrides).
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

    /// Apply environment overrides (highest priority).
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = env("ROUNDTABLE_API_KEY")
                .or_else(|| env("OPENAI_API_KEY"))
                .or_else(|| env("AZURE_OPENAI_API_KEY"));
        }

        let explicit_provider = env("ROUNDTABLE_PROVIDER");

        if let Some(endpoint) = env("AZURE_OPENAI_ENDPOINT") {
            let azure = self.providers.entry("azure".into()).or_default();
            azure.api_url = Some(endpoint);
            if azure.api_key.is_none() {
                azure.api_key = env("AZURE_OPENAI_API_KEY");
            }
            if let Some(deployment) = env("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME") {
                azure.default_model = Some(deployment);
            }
            if explicit_provider.is_none() {
                self.default_provider = "azure".into();
            }
        }

        if let Some(provider) = explicit_provider {
            self.default_provider = provider;
        }

        if let Some(model) = env("ROUNDTABLE_MODEL") {
            self.default_model = model;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.conversation.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "conversation.max_turns must be at least 1".into(),
            ));
        }

        if self.conversation.max_messages < 2 {
            return Err(ConfigError::ValidationError(
                "conversation.max_messages must leave room for at least one turn".into(),
            ));
        }

        if self.conversation.approval_keyword.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "conversation.approval_keyword must not be empty".into(),
            ));
        }

        if self.personas.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one persona must be configured".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for persona in &self.personas {
            if !seen.insert(persona.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate persona name '{}'",
                    persona.name
                )));
            }
        }

        if !seen.contains(self.extraction.artifact_author.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "extraction.artifact_author '{}' is not a configured persona",
                self.extraction.artifact_author
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            conversation: ConversationConfig::default(),
            extraction: ExtractionConfig::default(),
            publish: PublishConfig::default(),
            personas: default_personas(),
        }
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
