//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline error
    #[error("{0}")]
    Pipeline(#[from] claimgate_pipeline::PipelineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML writing error
    #[error("TOML writing error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The background run could not be joined
    #[error("Run task failed: {0}")]
    Task(String),
}

impl CliError {
    /// Process exit code for this error
    ///
    /// Runs that stop for lack of claims or sources exit with 2, aborted
    /// runs with 130, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Pipeline(claimgate_pipeline::PipelineError::Aborted(_)) => 130,
            CliError::Pipeline(e) if e.is_fatal_input() => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimgate_pipeline::PipelineError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::from(PipelineError::NoSources).exit_code(), 2);
        assert_eq!(CliError::from(PipelineError::Aborted("write draft".into())).exit_code(), 130);
        assert_eq!(CliError::Config("bad".into()).exit_code(), 1);
    }
}
