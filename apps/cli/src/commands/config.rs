//! Configuration commands.

use super::types::ConfigCommand;
use crate::config::load_config;
use anyhow::Result;
use std::path::Path;

pub fn execute(command: ConfigCommand, config_path: Option<&Path>) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = load_config(config_path)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
