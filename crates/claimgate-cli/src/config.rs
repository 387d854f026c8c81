//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use claimgate_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Completion backend
    #[serde(default)]
    pub provider: ProviderKind,

    /// Completion endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Model per tier
    #[serde(default)]
    pub models: Models,

    /// Search backend
    #[serde(default)]
    pub search: SearchSettings,

    /// Where articles are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where run logs are written; `<output_dir>/logs` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Completion backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Scripted offline provider
    Mock,
}

/// Model names per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Models {
    /// Model for premium roles
    pub premium: String,

    /// Model for budget roles
    pub budget: String,
}

/// Search backend settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Search endpoint answering `?q=<query>&n=<count>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token for the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".claimgate").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is read
    /// if present, otherwise defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Directory for run logs.
    pub fn effective_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| self.output_dir.join("logs"))
    }

    /// Check provider settings and the pipeline section.
    pub fn validate(&self) -> Result<()> {
        if self.provider == ProviderKind::Ollama {
            if self.endpoint.trim().is_empty() {
                return Err(CliError::Config("endpoint must not be empty".into()));
            }
            if self.models.premium.trim().is_empty() || self.models.budget.trim().is_empty() {
                return Err(CliError::Config("models.premium and models.budget must be set".into()));
            }
        }
        if self.timeout_secs == 0 {
            return Err(CliError::Config("timeout_secs must be at least 1".into()));
        }
        if matches!(&self.search.endpoint, Some(e) if e.trim().is_empty()) {
            return Err(CliError::Config("search.endpoint must not be empty when set".into()));
        }
        self.pipeline
            .validate()
            .map_err(|e| CliError::Config(format!("pipeline: {}", e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            models: Models::default(),
            search: SearchSettings::default(),
            output_dir: default_output_dir(),
            log_dir: None,
            color: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for Models {
    fn default() -> Self {
        Self {
            premium: "llama3.1:70b".to_string(),
            budget: "llama3.1:8b".to_string(),
        }
    }
}

fn default_endpoint() -> String {
    claimgate_llm::ollama::DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    claimgate_llm::ollama::DEFAULT_TIMEOUT_SECS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("articles")
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert_eq!(config.effective_log_dir(), PathBuf::from("articles").join("logs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.provider = ProviderKind::Mock;
        config.search.endpoint = Some("http://localhost:8888/search".to_string());
        config.pipeline.revision.max_iterations = 4;

        config.save_to(&path).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "provider = \"mock\"\noutput_dir = \"out\"\n\n[pipeline.mining]\nmin_total_claims = 20\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.pipeline.mining.min_total_claims, 20);
        assert_eq!(config.pipeline.mining.min_c_claims, 5);
        assert_eq!(config.models, Models::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.models.budget = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.revision.min_ratio = 2.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline"));
    }
}
