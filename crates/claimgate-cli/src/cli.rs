//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use claimgate_domain::ModelTier;
use std::path::PathBuf;

/// Claimgate - Write cited articles from evidence-gated claims.
#[derive(Debug, Parser)]
#[command(name = "claimgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CLAIMGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research a question and write the article
    Run(RunArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Check a configuration file without running anything
    ValidateConfig(ValidateArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// The research question
    pub question: String,

    /// Directory for the article
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Pipeline preset to start from
    #[arg(short, long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Run every agent on one tier
    #[arg(short, long, value_enum)]
    pub tier: Option<TierArg>,

    /// Rewrites allowed after the first draft
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Skip model judgment in rating and review
    #[arg(long)]
    pub no_judgment: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: CliFormat,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

/// Arguments for validate-config.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// CLI configuration or bare pipeline configuration (TOML)
    pub file: PathBuf,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Progress lines and a summary table
    Text,
    /// One JSON document on stdout
    Json,
}

/// Tier argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TierArg {
    /// Stronger, slower model
    Premium,
    /// Cheaper, faster model
    Budget,
}

/// Preset argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PresetArg {
    /// Balanced defaults
    Default,
    /// Fewer claims and rewrites
    Quick,
    /// More claims, sources and rewrites
    Thorough,
}

impl PresetArg {
    /// Preset name as understood by the pipeline
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetArg::Default => "default",
            PresetArg::Quick => "quick",
            PresetArg::Thorough => "thorough",
        }
    }
}

impl From<TierArg> for ModelTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Premium => ModelTier::Premium,
            TierArg::Budget => ModelTier::Budget,
        }
    }
}
