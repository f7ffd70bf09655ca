//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for tern
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default model id
    pub model: Option<String>,
    /// API base URL
    pub base_url: Option<String>,
    /// Context window override in tokens
    pub context_window: Option<u32>,
    /// API key (environment variable is preferred)
    pub api_key: Option<String>,
    /// Tool names that run without an approval prompt
    pub auto_approve: Vec<String>,
    /// Path to a ripgrep-compatible search binary
    pub search_binary: Option<String>,
}

impl Config {
    pub const DEFAULT_MODEL: &'static str = "claude-sonnet-4-5-20250929";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    pub const DEFAULT_CONTEXT_WINDOW: u32 = 200_000;

    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tern")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("TERN_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Effective model id
    pub fn model_id(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string())
    }

    /// Effective base URL
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
    }

    /// Effective context window
    pub fn effective_context_window(&self) -> u32 {
        self.context_window.unwrap_or(Self::DEFAULT_CONTEXT_WINDOW)
    }

    /// API key from config, falling back to the environment
    pub fn get_api_key(&self) -> Option<String> {
        if self.api_key.is_some() {
            return self.api_key.clone();
        }
        std::env::var("ANTHROPIC_API_KEY").ok()
    }

    /// Read one key for `config get`
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "model" => self.model.clone(),
            "base_url" => self.base_url.clone(),
            "context_window" => self.context_window.map(|v| v.to_string()),
            "api_key" => self.api_key.as_ref().map(|_| "(set)".to_string()),
            "auto_approve" => Some(self.auto_approve.join(",")),
            "search_binary" => self.search_binary.clone(),
            _ => None,
        }
    }

    /// Write one key for `config set`. Returns false for unknown keys.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match key {
            "model" => self.model = Some(value.to_string()),
            "base_url" => self.base_url = Some(value.to_string()),
            "context_window" => match value.parse() {
                Ok(v) => self.context_window = Some(v),
                Err(_) => return false,
            },
            "api_key" => self.api_key = Some(value.to_string()),
            "auto_approve" => {
                self.auto_approve = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "search_binary" => self.search_binary = Some(value.to_string()),
            _ => return false,
        }
        true
    }

    /// All keys for `config list`
    pub fn list(&self) -> Vec<(&'static str, String)> {
        [
            "model",
            "base_url",
            "context_window",
            "api_key",
            "auto_approve",
            "search_binary",
        ]
        .iter()
        .map(|k| (*k, self.get(k).unwrap_or_else(|| "(unset)".to_string())))
        .collect()
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# tern configuration file
# Place at ~/.config/tern/config.toml

# Default model to use
model = "claude-sonnet-4-5-20250929"

# API base URL
base_url = "https://api.anthropic.com"

# Context window in tokens
context_window = 200000

# Tools that run without an approval prompt
auto_approve = ["read_file", "list_files", "search_files", "list_code_definition_names"]

# Path to a ripgrep-compatible binary (defaults to `rg` on PATH)
# search_binary = "/usr/bin/rg"

# API key (environment variable ANTHROPIC_API_KEY is preferred)
# api_key = "sk-ant-..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.model_id(), Config::DEFAULT_MODEL);
        assert_eq!(c.effective_context_window(), 200_000);
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut c = Config::default();
        assert!(c.set("model", "claude-haiku-4-5-20251001"));
        assert_eq!(c.get("model").as_deref(), Some("claude-haiku-4-5-20251001"));

        assert!(c.set("auto_approve", "read_file, list_files"));
        assert_eq!(c.auto_approve, vec!["read_file", "list_files"]);

        assert!(!c.set("nonsense", "x"));
        assert!(!c.set("context_window", "not a number"));
    }

    #[test]
    fn test_api_key_masked_in_get() {
        let mut c = Config::default();
        c.set("api_key", "sk-secret");
        assert_eq!(c.get("api_key").as_deref(), Some("(set)"));
    }

    #[test]
    fn test_example_config_parses() {
        let parsed: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(parsed.model.as_deref(), Some("claude-sonnet-4-5-20250929"));
        assert!(parsed.auto_approve.contains(&"read_file".to_string()));
    }
}
