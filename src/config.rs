// ABOUTME: Configuration loading for sage.
// ABOUTME: Reads ~/.sage/config.toml, resolves credentials, and publishes API/TOKEN pairs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
    /// Named credential values, e.g. OPENAI_API_KEY or WOLFRAM_ALPHA_APPID.
    /// Environment variables with the same names take precedence.
    pub credentials: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            credentials: BTreeMap::new(),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub huggingface: HuggingFaceConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            huggingface: HuggingFaceConfig::default(),
        }
    }
}

/// Hugging Face Inference API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HuggingFaceConfig {
    pub repo_id: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            repo_id: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            max_new_tokens: 128,
            temperature: 0.5,
        }
    }
}

/// Agent defaults: which strategy and tools a fresh session starts with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub strategy: String,
    pub tools: Vec<String>,
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            strategy: "zero-shot-react".to_string(),
            tools: vec![
                "ddg-search".to_string(),
                "wolfram-alpha".to_string(),
                "wikipedia".to_string(),
            ],
            max_iterations: 15,
        }
    }
}

/// Knobs for individual tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub search_results: usize,
    pub python_timeout_seconds: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            search_results: 5,
            python_timeout_seconds: 30,
        }
    }
}

impl Config {
    /// Load config from ~/.sage/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path, falling back to defaults if absent.
    pub fn load_from(path: &PathBuf) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Path to the optional secrets env file loaded at startup.
    pub fn secrets_env_path() -> PathBuf {
        Self::config_dir().join("secrets.env")
    }

    /// Path to the persisted chat session.
    pub fn session_path() -> PathBuf {
        Self::config_dir().join("session.json")
    }

    /// Directory for session event logs.
    pub fn logs_dir() -> PathBuf {
        Self::config_dir().join("logs")
    }

    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sage")
    }

    /// Resolve a named credential: a non-empty environment variable wins,
    /// otherwise the `[credentials]` table entry is used.
    pub fn credential(&self, name: &str) -> Option<String> {
        if let Ok(val) = std::env::var(name)
            && !val.is_empty()
        {
            return Some(val);
        }
        self.credentials.get(name).cloned()
    }

    /// Publish credential pairs whose name contains "API" or "TOKEN" into the
    /// process environment, for subprocess tools and libraries that read env
    /// vars directly. Idempotent; pairs outside the naming convention are left
    /// alone, and nothing fails when a value is missing.
    pub fn publish_credentials(&self) {
        for (name, value) in &self.credentials {
            if name.contains("API") || name.contains("TOKEN") {
                // SAFETY: called during startup (and from single-purpose
                // tests) before anything else reads the environment
                // concurrently.
                unsafe { std::env::set_var(name, value) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.agent.strategy, "zero-shot-react");
        assert_eq!(
            config.agent.tools,
            vec!["ddg-search", "wolfram-alpha", "wikipedia"]
        );
        assert_eq!(config.agent.max_iterations, 15);
        assert!(config.credentials.is_empty());
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
[llm]
provider = "huggingface"
model = "gpt-4o"
temperature = 0.2

[llm.huggingface]
repo_id = "mistralai/Mistral-7B-Instruct-v0.2"
max_new_tokens = 256

[agent]
strategy = "plan-and-solve"
tools = ["wikipedia", "arxiv"]
max_iterations = 5

[credentials]
OPENAI_API_KEY = "sk-from-file"
HUGGINGFACEHUB_API_TOKEN = "hf-from-file"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, "huggingface");
        assert_eq!(config.llm.huggingface.max_new_tokens, 256);
        assert_eq!(config.agent.strategy, "plan-and-solve");
        assert_eq!(config.agent.tools, vec!["wikipedia", "arxiv"]);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(
            config.credentials.get("OPENAI_API_KEY").map(String::as_str),
            Some("sk-from-file")
        );
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let toml_str = r#"
[llm]
model = "gpt-4o"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.tools.search_results, 5);
    }

    #[test]
    fn publish_copies_only_api_and_token_pairs() {
        let mut config = Config::default();
        config.credentials.insert(
            "SAGE_PUBTEST_OPENAI_API_KEY".to_string(),
            "sk-test".to_string(),
        );
        config
            .credentials
            .insert("SAGE_PUBTEST_OTHER".to_string(), "x".to_string());

        config.publish_credentials();

        assert_eq!(
            std::env::var("SAGE_PUBTEST_OPENAI_API_KEY").as_deref(),
            Ok("sk-test")
        );
        assert!(std::env::var("SAGE_PUBTEST_OTHER").is_err());
    }

    #[test]
    fn publish_is_idempotent() {
        let mut config = Config::default();
        config
            .credentials
            .insert("SAGE_IDEM_TEST_TOKEN".to_string(), "tok".to_string());

        config.publish_credentials();
        config.publish_credentials();

        assert_eq!(std::env::var("SAGE_IDEM_TEST_TOKEN").as_deref(), Ok("tok"));
    }

    #[test]
    fn credential_prefers_environment_over_table() {
        let mut config = Config::default();
        config
            .credentials
            .insert("SAGE_CRED_TEST_API_KEY".to_string(), "from-file".to_string());

        assert_eq!(
            config.credential("SAGE_CRED_TEST_API_KEY").as_deref(),
            Some("from-file")
        );

        unsafe { std::env::set_var("SAGE_CRED_TEST_API_KEY", "from-env") };
        assert_eq!(
            config.credential("SAGE_CRED_TEST_API_KEY").as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn credential_missing_is_none() {
        let config = Config::default();
        assert_eq!(config.credential("SAGE_NO_SUCH_CRED"), None);
    }
}
