//! `fuelcheck config` - validate and print engine configuration.

use std::path::PathBuf;

use clap::Subcommand;

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::recon::load_config;
use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  fuelcheck config validate vessel.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// Print the effective config as TOML (defaults when --config is omitted)
    #[command(after_help = "\
Examples:
  fuelcheck config show > vessel.toml
  fuelcheck config show --config vessel.toml")]
    Show {
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Validate { config } => cmd_config_validate(config),
        ConfigCommands::Show { config } => cmd_config_show(config),
    }
}

fn cmd_config_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    eprintln!(
        "valid: window {}h, pass order {}, {} fuel code(s), {} blend(s), BDN sheet '{}'",
        config.matching.window_hours,
        config.matching.pass_order,
        config.fuels.recognized.len(),
        config.fuels.blends.len(),
        config.bdn.sheet_name,
    );
    Ok(())
}

fn cmd_config_show(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let toml_str = config
        .to_toml()
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))?;
    print!("{toml_str}");
    Ok(())
}
