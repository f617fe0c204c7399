//! Rewrite command implementation.

use super::types::RewriteCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn execute(command: RewriteCommand) -> Result<()> {
    match command {
        RewriteCommand::Solver { input, output } => {
            rewrite_file(&input, output.as_deref(), kiln_training::rewrite_solver_bytes)
        }
        RewriteCommand::Net { input, output } => {
            rewrite_file(&input, output.as_deref(), kiln_training::rewrite_network_bytes)
        }
    }
}

fn rewrite_file(
    input: &Path,
    output: Option<&Path>,
    rewrite: fn(&str, &[u8]) -> kiln_training::PrepResult<Vec<u8>>,
) -> Result<()> {
    let source = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let rewritten = rewrite(&input.display().to_string(), &source)?;

    match output {
        Some(path) => {
            std::fs::write(path, &rewritten).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Rewrote".green(), path.display().to_string().cyan());
        }
        None => print!("{}", String::from_utf8_lossy(&rewritten)),
    }
    Ok(())
}
