//! Prepare and stage command implementations.

use crate::config::load_config;
use anyhow::{Context, Result};
use colored::Colorize;
use kiln_training::{JobPreparer, SolverJobId};
use serde_json::json;
use std::path::{Path, PathBuf};

pub fn prepare(job_id: &str, config_path: Option<&Path>, json_output: bool) -> Result<()> {
    let preparer = JobPreparer::from_config(load_config(config_path)?)?;
    let job = preparer
        .prepare(&SolverJobId::from(job_id))
        .with_context(|| format!("Failed to prepare job {job_id}"))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    println!("{} {}", "Prepared job".bold().green(), job.id.to_string().cyan());
    println!("  Solver:  {}", job.specification_url);
    println!("  Network: {}", job.specification_net_url);
    Ok(())
}

pub fn stage(job_id: &str, work_dir: Option<PathBuf>, config_path: Option<&Path>, json_output: bool) -> Result<()> {
    let preparer = JobPreparer::from_config(load_config(config_path)?)?;
    let job = preparer.load(&SolverJobId::from(job_id))?;
    let work_dir = work_dir.unwrap_or_else(|| preparer.work_layout(&job).root().to_path_buf());

    let labels = preparer
        .stage(&job, &work_dir)
        .with_context(|| format!("Failed to stage job {job_id} into {}", work_dir.display()))?;

    if json_output {
        let out = json!({ "job_id": job.id, "work_dir": work_dir, "labels": labels });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", "Staged job".bold().green(), job.id.to_string().cyan());
    println!("  Work dir: {}", work_dir.display());
    println!("  Labels:   {}", labels.join(", ").dimmed());
    Ok(())
}
