//! Run command implementation.

use crate::cli::{CliFormat, RunArgs};
use crate::config::{Config, ProviderKind};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use claimgate_domain::CompletionService;
use claimgate_llm::{MockProvider, OllamaProvider};
use claimgate_pipeline::{AgentsConfig, ModelSet, Orchestrator, PipelineConfig};
use claimgate_retrieval::{HttpSearchTool, ToolCategory, ToolRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Execute the run command.
pub async fn execute_run(args: RunArgs, mut config: Config, formatter: &Formatter) -> Result<()> {
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    let registry = build_registry(&config);
    if registry.is_empty() {
        warn!("no search endpoint configured; retrieval will find nothing");
        eprintln!("{}", formatter.warning("No search endpoint configured (search.endpoint)"));
    }

    fs::create_dir_all(&config.output_dir)?;
    let orchestrator = Arc::new(
        Orchestrator::new(build_models(&config), Arc::new(registry), config.pipeline.clone())
            .with_log_dir(config.effective_log_dir()),
    );

    let abort = orchestrator.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let (mut events, handle) = Arc::clone(&orchestrator).spawn(args.question.clone());
    while let Some(event) = events.recv().await {
        if formatter.format() == CliFormat::Text {
            eprintln!("{}", formatter.event(&event));
        }
    }
    let outcome = handle.await.map_err(|e| CliError::Task(e.to_string()))??;

    let path = article_path(&config.output_dir, &args.question, &outcome.run_id);
    fs::write(&path, &outcome.article)?;
    info!(path = %path.display(), "article written");

    println!("{}", formatter.outcome(&outcome, &path)?);
    Ok(())
}

/// Apply command-line flags on top of the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(preset) = args.preset {
        config.pipeline = PipelineConfig::preset(preset.as_str())
            .ok_or_else(|| CliError::InvalidInput(format!("unknown preset '{}'", preset.as_str())))?;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(tier) = args.tier {
        config.pipeline.agents = AgentsConfig::uniform(tier.into());
    }
    if let Some(max) = args.max_iterations {
        config.pipeline.revision.max_iterations = max;
    }
    if args.no_judgment {
        config.pipeline.rating.use_judgment = false;
        config.pipeline.review.use_judgment = false;
    }
    Ok(())
}

/// Completion services for the configured provider.
pub fn build_models(config: &Config) -> ModelSet {
    match config.provider {
        ProviderKind::Ollama => {
            let make = |model: &str| -> Arc<dyn CompletionService> {
                Arc::new(OllamaProvider::new(&config.endpoint, model).with_timeout_secs(config.timeout_secs))
            };
            if config.models.premium == config.models.budget {
                ModelSet::single(make(&config.models.premium))
            } else {
                ModelSet::tiered(make(&config.models.premium), make(&config.models.budget))
            }
        }
        ProviderKind::Mock => ModelSet::single(Arc::new(MockProvider::default())),
    }
}

/// Search tools for the configured endpoint.
///
/// One web tool serves every category; the registry falls back to it.
pub fn build_registry(config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    if let Some(endpoint) = &config.search.endpoint {
        let mut tool = HttpSearchTool::new("web", endpoint);
        if let Some(key) = &config.search.api_key {
            tool = tool.with_api_key(key);
        }
        registry.register(ToolCategory::Web, Arc::new(tool));
    }
    registry
}

/// `<output_dir>/<slug>_<run-id>.md`
pub fn article_path(output_dir: &Path, question: &str, run_id: &str) -> PathBuf {
    output_dir.join(format!("{}_{}.md", slugify(question), run_id))
}

/// Lowercase ASCII words joined by dashes, at most 60 characters
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= 60 {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "article".to_string()
    } else {
        slug.to_string()
    }
}
