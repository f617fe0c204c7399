//! Job record commands.

use super::types::JobCommand;
use crate::config::load_config;
use anyhow::{Context, Result};
use colored::Colorize;
use kiln_training::{DatasetId, FileJobStore, JobStore, SolverJob, SolverJobId};
use std::path::Path;

pub fn execute(command: JobCommand, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = FileJobStore::new(config.job_store.root.clone());
    match command {
        JobCommand::Create { dataset, solver_url, net_url, id } => {
            create(&store, DatasetId(dataset), solver_url, net_url, id)
        }
        JobCommand::Show { job_id, json } => show(&store, &SolverJobId(job_id), json),
    }
}

fn create(
    store: &FileJobStore,
    dataset: DatasetId,
    solver_url: String,
    net_url: String,
    id: Option<String>,
) -> Result<()> {
    let mut job = SolverJob::new(dataset, solver_url, net_url);
    if let Some(id) = id {
        job.id = SolverJobId(id);
    }
    job.validate()?;
    store.insert(&job).with_context(|| format!("Failed to create job {}", job.id))?;
    println!("{}", job.id);
    Ok(())
}

fn show(store: &FileJobStore, id: &SolverJobId, json_output: bool) -> Result<()> {
    let job = store.load(id).with_context(|| format!("Failed to load job {id}"))?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Job {}", job.id).bold().cyan());
    println!("  Revision: {}", job.revision);
    println!("  Dataset:  {}", job.dataset_id);
    println!("  Solver:   {}", job.specification_url);
    println!("  Network:  {}", job.specification_net_url);
    let state = if job.is_rewritten() { "prepared".green() } else { "pending".yellow() };
    println!("  State:    {state}");
    println!();
    Ok(())
}
