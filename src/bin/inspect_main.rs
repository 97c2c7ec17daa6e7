use anyhow::{Context, Result};
use log::info;
use std::env;
use std::path::PathBuf;

use attendance_graph_export::env_loader;
use attendance_graph_export::inspect_file;

fn main() -> Result<()> {
    env_loader::load_env();
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let path = match args.get(1) {
        Some(arg) => PathBuf::from(arg),
        None => anyhow::bail!("usage: inspect <file.csv|file.xlsx>"),
    };

    info!("Inspecting columns of {:?}", path);
    let inspection = inspect_file(&path)
        .with_context(|| format!("Failed to inspect file {}", path.display()))?;

    println!("{}", serde_json::to_string_pretty(&inspection)?);
    Ok(())
}
