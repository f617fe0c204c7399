//! Unpack command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use kiln_training::{LabelPolicy, unpack_and_index};
use serde_json::json;
use std::path::Path;

pub fn execute(
    archive: &Path,
    dest: &Path,
    toc_path: Option<&Path>,
    prefix: Option<&str>,
    stable_labels: bool,
    json_output: bool,
) -> Result<()> {
    let policy = if stable_labels { LabelPolicy::Stable } else { LabelPolicy::Sequential };
    let file = std::fs::File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let name = archive.display().to_string();
    let unpacked = unpack_and_index(&name, std::io::BufReader::new(file), dest, policy)?;

    let toc = match prefix {
        Some(prefix) => unpacked.toc.with_parent_dir(prefix),
        None => unpacked.toc,
    };

    match toc_path {
        Some(path) => toc.write_to_file(path)?,
        None if !json_output => print!("{toc}"),
        None => {}
    }

    if json_output {
        let out = json!({
            "archive": name,
            "dest": dest,
            "entries": unpacked.entries.len(),
            "labels": unpacked.labels,
            "toc": toc.entries(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    eprintln!(
        "{} {} entries, {} labels into {}",
        "Unpacked".green(),
        unpacked.entries.len(),
        unpacked.labels.len(),
        dest.display().to_string().cyan()
    );
    Ok(())
}
