//! Claimgate CLI - write cited articles from evidence-gated claims.

use claimgate_cli::cli::{CliFormat, ConfigAction};
use claimgate_cli::commands;
use claimgate_cli::{Cli, Command, Config, Formatter};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = match &cli.command {
        Command::Run(args) => args.format,
        _ => CliFormat::Text,
    };
    let fallback = Formatter::new(format, !cli.no_color);

    if let Err(e) = run(cli, format).await {
        eprintln!("{}", fallback.error(&e.to_string()));
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, format: CliFormat) -> claimgate_cli::Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    match cli.command {
        Command::ValidateConfig(args) => {
            let formatter = Formatter::new(format, !cli.no_color);
            commands::execute_validate(args, &formatter)
        }
        Command::Config(args) => {
            let config = match args.action {
                // init must not fail on an unreadable existing file
                ConfigAction::Init { .. } => Config::default(),
                _ => Config::load(cli.config.as_deref())?,
            };
            let formatter = Formatter::new(format, !cli.no_color && config.color);
            commands::execute_config(args, &config_path, &config, &formatter)
        }
        Command::Run(args) => {
            let config = Config::load(cli.config.as_deref())?;
            let formatter = Formatter::new(format, !cli.no_color && config.color);
            commands::execute_run(args, config, &formatter).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
