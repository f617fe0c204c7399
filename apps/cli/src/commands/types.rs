//! Command type definitions shared between main.rs and the command modules.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum RewriteCommand {
    /// Point `net` and `snapshot_prefix` at the work layout
    Solver {
        /// Solver configuration file
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Point image and data input layers at the manifests and data directories
    Net {
        /// Network configuration file
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum JobCommand {
    /// Create a job record
    Create {
        /// Dataset ID
        #[arg(long)]
        dataset: String,

        /// Solver configuration URL or blob:// reference
        #[arg(long)]
        solver_url: String,

        /// Network configuration URL or blob:// reference
        #[arg(long)]
        net_url: String,

        /// Job ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Show a job record
    Show {
        /// Job ID
        job_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
}
