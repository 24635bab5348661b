use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{MentorError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the proxy listens on.  Overridable with `MENTOR_BIND`.
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub provider: ProviderConfig,
}

// -- Provider ------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the generative-language API (no trailing slash).
    /// Can be overridden with the `GEMINI_BASE_URL` env var.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name used in the `generateContent` path.
    /// Can be overridden with the `GEMINI_MODEL` env var.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key.  Prefer the `GOOGLE_AI_API_KEY` env var; it wins over
    /// this field when both are set.
    #[serde(default)]
    pub api_key: String,

    /// Outbound request timeout in seconds (0 = use the 300s ceiling).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            provider: ProviderConfig::default(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.8
}
fn default_top_k() -> u32 {
    40
}
fn default_max_output_tokens() -> u32 {
    2048
}

// -- Config impl ---------------------------------------------------------

impl Config {
    /// Load config from the given path, or the default XDG config location,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        let mut config = if config_path.exists() {
            info!("loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)
                .map_err(|e| MentorError::Config(format!("parse error: {e}")))?
        } else {
            info!("no config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(bind) = non_empty_env("MENTOR_BIND") {
            self.bind = bind;
        }
        if let Some(base_url) = non_empty_env("GEMINI_BASE_URL") {
            self.provider.base_url = base_url;
        }
        if let Some(model) = non_empty_env("GEMINI_MODEL") {
            self.provider.model = model;
        }
        if let Some(key) = non_empty_env("GOOGLE_AI_API_KEY") {
            self.provider.api_key = key;
        }
        self.provider.base_url = self.provider.base_url.trim_end_matches('/').to_string();
    }

    /// Resolve the provider credential.  Called once at startup; the result
    /// is injected into the handler state instead of being re-read per call.
    pub fn provider_credential(&self) -> Result<String> {
        let key = self.provider.api_key.trim();
        if key.is_empty() {
            return Err(MentorError::Configuration(
                "Google AI API key not configured".into(),
            ));
        }
        Ok(key.to_string())
    }

    /// Returns the default config file path: `$XDG_CONFIG_HOME/mentor-proxy/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("mentor-proxy")
            .join("config.toml")
    }

    /// Generate the default config file contents.
    pub fn default_config_contents() -> &'static str {
        include_str!("../config.example.toml")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let c = Config::default();
        assert_eq!(c.bind, "0.0.0.0:8000");
        assert_eq!(c.provider.model, "gemini-1.5-flash-latest");
        assert_eq!(
            c.provider.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert!(c.provider.api_key.is_empty());
        assert_eq!(c.provider.timeout_secs, 60);
    }

    #[test]
    fn default_generation_parameters() {
        let p = ProviderConfig::default();
        assert!((p.temperature - 0.7).abs() < 0.001);
        assert!((p.top_p - 0.8).abs() < 0.001);
        assert_eq!(p.top_k, 40);
        assert_eq!(p.max_output_tokens, 2048);
    }

    #[test]
    fn parse_minimal_toml() {
        let c: Config = toml::from_str(r#"bind = "127.0.0.1:9000""#).unwrap();
        assert_eq!(c.bind, "127.0.0.1:9000");
        assert_eq!(c.provider.top_k, 40);
    }

    #[test]
    fn parse_provider_section() {
        let toml_str = r#"
        [provider]
        model = "gemini-1.5-pro"
        api_key = "from-file"
        timeout_secs = 15
        temperature = 0.2
        "#;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.provider.model, "gemini-1.5-pro");
        assert_eq!(c.provider.api_key, "from-file");
        assert_eq!(c.provider.timeout_secs, 15);
        assert!((c.provider.temperature - 0.2).abs() < 0.001);
        assert_eq!(c.provider.max_output_tokens, 2048);
    }

    #[test]
    fn credential_missing_is_configuration_error() {
        let c = Config::default();
        let err = c.provider_credential().unwrap_err();
        assert!(matches!(err, MentorError::Configuration(_)));
        assert_eq!(err.to_string(), "Google AI API key not configured");
    }

    #[test]
    fn credential_is_trimmed() {
        let mut c = Config::default();
        c.provider.api_key = "  abc123 \n".into();
        assert_eq!(c.provider_credential().unwrap(), "abc123");
    }

    #[test]
    fn load_nonexistent_path_uses_defaults() {
        let c = Config::load(Some(Path::new("/tmp/nonexistent-mentor-proxy-test.toml"))).unwrap();
        assert_eq!(c.provider.top_k, 40);
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid %%% toml").unwrap();
        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(MentorError::Config(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provider]\ntop_k = 12\n").unwrap();
        let c = Config::load(Some(&path)).unwrap();
        assert_eq!(c.provider.top_k, 12);
    }

    #[test]
    fn default_config_path_has_app_name() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("mentor-proxy"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn default_config_contents_parses() {
        let c: Config = toml::from_str(Config::default_config_contents()).unwrap();
        assert_eq!(c.provider.model, "gemini-1.5-flash-latest");
    }
}
