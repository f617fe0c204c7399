//! Kiln CLI - prepares solver jobs for the training engine
//!
//! Provides a `kiln` command for rewriting configurations, unpacking
//! dataset archives and running job preparation against the configured
//! blob and job stores.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{ConfigCommand, JobCommand, RewriteCommand};

/// Kiln - training job preparation
#[derive(Parser, Debug)]
#[command(name = "kiln", author, version, about = "Kiln - training job preparation")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (overrides KILN_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite a solver or network configuration for the work layout
    #[command(subcommand)]
    Rewrite(RewriteCommand),

    /// Unpack a dataset archive and print or write its labeled index
    Unpack {
        /// Path to a .tar.gz archive
        archive: PathBuf,

        /// Directory to extract into
        dest: PathBuf,

        /// Write the index to this file instead of stdout
        #[arg(long)]
        toc: Option<PathBuf>,

        /// Prefix index paths with this directory (e.g. training-data)
        #[arg(long)]
        prefix: Option<String>,

        /// Keep one label per directory even when entries are not grouped
        #[arg(long)]
        stable_labels: bool,

        /// Output summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage job records
    #[command(subcommand)]
    Job(JobCommand),

    /// Rewrite a job's configurations into the blob store and update its record
    Prepare {
        /// Job ID
        job_id: String,

        /// Output the updated record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stage a prepared job's configurations and dataset into a work directory
    Stage {
        /// Job ID
        job_id: String,

        /// Work directory (defaults to <work_directory>/<job-id>)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Output summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // logs go to stderr so stdout stays parseable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = config::config_path(args.config);

    match args.command {
        Command::Rewrite(command) => commands::rewrite::execute(command),
        Command::Unpack { archive, dest, toc, prefix, stable_labels, json } => {
            commands::unpack::execute(&archive, &dest, toc.as_deref(), prefix.as_deref(), stable_labels, json)
        }
        Command::Job(command) => commands::job::execute(command, config_path.as_deref()),
        Command::Prepare { job_id, json } => commands::prepare::prepare(&job_id, config_path.as_deref(), json),
        Command::Stage { job_id, work_dir, json } => {
            commands::prepare::stage(&job_id, work_dir, config_path.as_deref(), json)
        }
        Command::Config(command) => commands::config::execute(command, config_path.as_deref()),
    }
}
