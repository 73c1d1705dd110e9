//! Configuration schema definitions.

use std::path::PathBuf;

use ragline::prompt::{DEFAULT_CONTEXT_HEADER, DEFAULT_PERSONA, PromptTemplate};
use ragline::server::DEFAULT_WEBHOOK_PATH;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// LINE channel credentials.
    #[serde(default)]
    pub line: LineSection,

    /// OpenAI settings.
    #[serde(default)]
    pub openai: OpenAISection,

    /// System instruction.
    #[serde(default)]
    pub persona: PersonaSection,

    /// Retrieval augmentation.
    #[serde(default)]
    pub retrieval: RetrievalSection,

    /// Reply handling.
    #[serde(default)]
    pub relay: RelaySection,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route LINE posts webhooks to.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

fn default_webhook_path() -> String {
    DEFAULT_WEBHOOK_PATH.to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
        }
    }
}

/// LINE channel credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSection {
    /// Channel access token (`LINE_CHANNEL_ACCESS_TOKEN`).
    #[serde(default)]
    pub channel_access_token: Option<String>,
    /// Channel secret for signature checks (`LINE_CHANNEL_SECRET`).
    #[serde(default)]
    pub channel_secret: Option<String>,
    /// API base URL override.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Reply request timeout in seconds.
    #[serde(default = "default_line_timeout")]
    pub timeout_secs: u64,
}

const fn default_line_timeout() -> u64 {
    30
}

impl Default for LineSection {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            api_base: None,
            timeout_secs: default_line_timeout(),
        }
    }
}

/// OpenAI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAISection {
    /// API key (`OPENAI_API_KEY`).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override for OpenAI-compatible servers.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Organization ID.
    #[serde(default)]
    pub organization: Option<String>,
    /// Chat model.
    #[serde(default = "default_model")]
    pub model: String,
    /// Embedding model used when building an index.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
    /// Completion token cap.
    #[serde(default)]
    pub max_completion_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_openai_timeout() -> u64 {
    120
}

impl Default for OpenAISection {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            organization: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_openai_timeout(),
            max_completion_tokens: None,
            temperature: None,
        }
    }
}

/// System instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaSection {
    /// Persona instruction sent with every message.
    #[serde(default = "default_instruction")]
    pub instruction: String,
    /// Heading placed before retrieved reference passages.
    #[serde(default = "default_context_header")]
    pub context_header: String,
}

fn default_instruction() -> String {
    DEFAULT_PERSONA.to_string()
}

fn default_context_header() -> String {
    DEFAULT_CONTEXT_HEADER.to_string()
}

impl Default for PersonaSection {
    fn default() -> Self {
        Self {
            instruction: default_instruction(),
            context_header: default_context_header(),
        }
    }
}

impl PersonaSection {
    /// Build the prompt template.
    #[must_use]
    pub fn template(&self) -> PromptTemplate {
        PromptTemplate::new(self.instruction.clone()).with_context_header(self.context_header.clone())
    }
}

/// Retrieval augmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    /// Look up reference passages before calling the model.
    #[serde(default)]
    pub enabled: bool,
    /// Index file produced by `ragline index build`.
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    /// Passages spliced into the instruction.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity for a passage to be used.
    #[serde(default)]
    pub min_score: Option<f32>,
    /// HNSW search candidate list size.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

const fn default_top_k() -> usize {
    1
}

const fn default_ef_search() -> usize {
    64
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            enabled: false,
            index_path: None,
            top_k: default_top_k(),
            min_score: None,
            ef_search: default_ef_search(),
        }
    }
}

impl RetrievalSection {
    /// Index location used when `index_path` is not set.
    pub const DEFAULT_INDEX_PATH: &'static str = "data/index.json";

    /// The configured index path, or [`Self::DEFAULT_INDEX_PATH`].
    #[must_use]
    pub fn resolved_index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_INDEX_PATH))
    }
}

/// Reply handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySection {
    /// Text sent when the model fails.
    #[serde(default)]
    pub fallback_reply: Option<String>,
    /// Skip events LINE marks as redelivered.
    #[serde(default = "default_true")]
    pub skip_redeliveries: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            fallback_reply: None,
            skip_redeliveries: true,
        }
    }
}

impl BotConfig {
    /// Validate the configuration and return all issues found.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if is_blank(self.line.channel_access_token.as_deref()) {
            issues.push(ConfigIssue::error(
                "line.channel_access_token",
                "No channel access token. Set LINE_CHANNEL_ACCESS_TOKEN.",
            ));
        }

        if is_blank(self.line.channel_secret.as_deref()) {
            issues.push(ConfigIssue::warning(
                "line.channel_secret",
                "No channel secret. Webhook signatures will not be verified.",
            ));
        }

        if is_blank(self.openai.api_key.as_deref()) {
            issues.push(ConfigIssue::error(
                "openai.api_key",
                "No OpenAI API key. Set OPENAI_API_KEY.",
            ));
        }

        if let Some(t) = self.openai.temperature {
            if !(0.0..=2.0).contains(&t) {
                issues.push(ConfigIssue::error(
                    "openai.temperature",
                    "Temperature must be between 0.0 and 2.0",
                ));
            }
        }

        if !self.server.webhook_path.starts_with('/') {
            issues.push(ConfigIssue::error(
                "server.webhook_path",
                "Webhook path must start with '/'",
            ));
        }

        if self.retrieval.enabled {
            let path = self.retrieval.resolved_index_path();
            if !path.exists() {
                issues.push(ConfigIssue::error(
                    "retrieval.index_path",
                    format!(
                        "Index file {} does not exist. Run 'ragline index build'.",
                        path.display()
                    ),
                ));
            }
        }

        if self.retrieval.top_k == 0 {
            issues.push(ConfigIssue::error(
                "retrieval.top_k",
                "top_k must be at least 1",
            ));
        }

        if let Some(min_score) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                issues.push(ConfigIssue::warning(
                    "retrieval.min_score",
                    "min_score is outside the cosine similarity range [-1, 1]",
                ));
            }
        }

        if self
            .relay
            .fallback_reply
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            issues.push(ConfigIssue::warning(
                "relay.fallback_reply",
                "Fallback reply is empty and will never be sent",
            ));
        }

        issues
    }

    /// Check if the configuration is valid (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate()
            .iter()
            .all(|issue| issue.level != IssueLevel::Error)
    }

    /// Merge environment variables into the configuration.
    ///
    /// Environment values take precedence over the file.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Merge variables from `lookup` into the configuration.
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(token) = var("LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = Some(token);
        }
        if let Some(secret) = var("LINE_CHANNEL_SECRET") {
            self.line.channel_secret = Some(secret);
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(base) = var("OPENAI_BASE_URL") {
            self.openai.api_base = Some(base);
        }
        if let Some(org) = var("OPENAI_ORGANIZATION") {
            self.openai.organization = Some(org);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(model) = var("OPENAI_EMBEDDING_MODEL") {
            self.openai.embedding_model = model;
        }
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = var("RAGLINE_INDEX_PATH") {
            self.retrieval.index_path = Some(PathBuf::from(path));
        }

        self
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Configuration validation issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Issue severity level.
    pub level: IssueLevel,
    /// Configuration path (e.g., "line.channel_secret").
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl ConfigIssue {
    /// Create an error-level issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a warning-level issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.level {
            IssueLevel::Error => "ERROR",
            IssueLevel::Warning => "WARN",
        };
        write!(f, "[{level}] {}: {}", self.path, self.message)
    }
}

/// Issue severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    /// Error - configuration is invalid.
    Error,
    /// Warning - configuration may not work as expected.
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete() -> BotConfig {
        let mut config = BotConfig::default();
        config.line.channel_access_token = Some("token".to_string());
        config.line.channel_secret = Some("secret".to_string());
        config.openai.api_key = Some("sk-test".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = BotConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.webhook_path, "/webhook");
        assert_eq!(config.openai.model, "gpt-4");
        assert!(!config.retrieval.enabled);
        assert!(config.relay.skip_redeliveries);
    }

    #[test]
    fn test_default_config_needs_credentials() {
        let issues = BotConfig::default().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|i| i.level == IssueLevel::Error)
            .map(|i| i.path.as_str())
            .collect();
        assert_eq!(errors, vec!["line.channel_access_token", "openai.api_key"]);
    }

    #[test]
    fn test_complete_config_is_valid() {
        let config = complete();
        assert!(config.is_valid());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_retrieval_requires_existing_index() {
        let mut config = complete();
        config.retrieval.enabled = true;
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "retrieval.index_path");
        assert!(issues[0].message.contains(RetrievalSection::DEFAULT_INDEX_PATH));

        config.retrieval.index_path = Some(PathBuf::from("/nonexistent/ragline/index.json"));
        assert!(!config.is_valid());

        let file = tempfile::NamedTempFile::new().unwrap();
        config.retrieval.index_path = Some(file.path().to_path_buf());
        assert!(config.is_valid());
    }

    #[test]
    fn test_index_path_defaults_when_unset() {
        let mut section = RetrievalSection::default();
        assert_eq!(
            section.resolved_index_path(),
            PathBuf::from(RetrievalSection::DEFAULT_INDEX_PATH)
        );

        section.index_path = Some(PathBuf::from("/srv/ragline/index.json"));
        assert_eq!(
            section.resolved_index_path(),
            PathBuf::from("/srv/ragline/index.json")
        );
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: BotConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [retrieval]
            enabled = true
            index_path = "data/index.json"
            top_k = 3

            [relay]
            fallback_reply = "ただいま応答できません。"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.ef_search, 64);
        assert_eq!(config.persona.instruction, DEFAULT_PERSONA);
        assert!(config.relay.skip_redeliveries);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(toml::from_str::<BotConfig>("[telegram]\nenabled = true").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LINE_CHANNEL_ACCESS_TOKEN", "env-token"),
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("PORT", "8000"),
            ("LINE_CHANNEL_SECRET", ""),
        ]);
        let mut config = BotConfig::default();
        config.line.channel_access_token = Some("file-token".to_string());
        config.line.channel_secret = Some("file-secret".to_string());

        let config = config.with_env_from(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.line.channel_access_token.as_deref(), Some("env-token"));
        assert_eq!(config.line.channel_secret.as_deref(), Some("file-secret"));
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_issue_display() {
        let issue = ConfigIssue::error("openai.api_key", "missing");
        assert_eq!(issue.to_string(), "[ERROR] openai.api_key: missing");
    }

    #[test]
    fn test_persona_template() {
        let mut config = BotConfig::default();
        config.persona.instruction = "Be brief.".to_string();
        assert_eq!(config.persona.template().render(&[]), "Be brief.");
    }
}
