//! validate-config command implementation.

use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use claimgate_pipeline::PipelineConfig;
use std::fs;
use std::path::Path;

/// Execute the validate-config command.
pub fn execute_validate(args: ValidateArgs, formatter: &Formatter) -> Result<()> {
    let kind = validate_file(&args.file)?;
    println!(
        "{}",
        formatter.success(&format!("{} is a valid {} configuration", args.file.display(), kind))
    );
    Ok(())
}

/// Validate a CLI configuration or a bare pipeline configuration.
///
/// Files with a `[pipeline]` table or a `provider` key are read as CLI
/// configuration; anything else as pipeline settings. Returns which one.
pub fn validate_file(path: &Path) -> Result<&'static str> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    let table: toml::Table = toml::from_str(&contents)?;

    if table.contains_key("pipeline") || table.contains_key("provider") {
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok("CLI")
    } else {
        PipelineConfig::from_toml(&contents)?;
        Ok("pipeline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("check.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_bare_pipeline_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[mining]\nmin_total_claims = 8\n\n[revision]\nmax_iterations = 1\n");
        assert_eq!(validate_file(&path).unwrap(), "pipeline");
    }

    #[test]
    fn test_cli_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "provider = \"mock\"\n\n[pipeline.review]\nmin_words = 800\n");
        assert_eq!(validate_file(&path).unwrap(), "CLI");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[revision]\nmin_ratio = 1.5\n");
        assert!(validate_file(&path).is_err());

        let path = write(&dir, "provider = \"ollama\"\ntimeout_secs = 0\n");
        assert!(matches!(validate_file(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[mining\n");
        assert!(matches!(validate_file(&path), Err(CliError::Toml(_))));
    }
}
