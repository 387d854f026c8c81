//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command against the file at `path`.
pub fn execute_config(args: ConfigArgs, path: &Path, config: &Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ConfigAction::Init { force } => {
            init_config(path, force)?;
            println!("{}", formatter.success(&format!("Wrote default configuration to {}", path.display())));
        }
        ConfigAction::Show => print!("{}", config.to_toml()?),
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Config::default().save_to(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        init_config(&path, false).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let err = init_config(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert!(init_config(&path, true).is_ok());
    }
}
