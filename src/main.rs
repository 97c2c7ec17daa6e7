use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use attendance_graph_export::env_loader;
use attendance_graph_export::{
    convert_many, ConversionRequest, FieldMapping, GraphMode, OutputFormat, PairColumns,
};

#[derive(Parser, Debug)]
#[command(
    name = "convert",
    version,
    about = "Convert event attendance spreadsheets into Gephi or Kumu node/edge tables"
)]
struct Cli {
    /// Input files (.csv or .xlsx)
    files: Vec<PathBuf>,

    /// Output format: gephi or kumu (unknown values fall back to gephi)
    #[arg(long, env = "GRAPH_OUTPUT_FORMAT", default_value = "gephi")]
    format: String,

    /// Graph mode: org_event, org_org or custom_ab
    #[arg(long, env = "GRAPH_MODE", default_value = "org_event")]
    mode: String,

    /// JSON file mapping logical fields to input columns
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Extra organization attribute to carry into the node table (repeatable)
    #[arg(long = "extra-attr")]
    extra_attrs: Vec<String>,

    /// Source column for custom_ab mode
    #[arg(long)]
    src_col: Option<String>,

    /// Target column for custom_ab mode
    #[arg(long)]
    dst_col: Option<String>,

    /// Edge label column for custom_ab mode
    #[arg(long)]
    edge_label_col: Option<String>,

    /// Directory for the generated files
    #[arg(long, env = "GRAPH_OUTPUT_DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// Also write an .xlsx workbook with Nodes/Edges/Summary sheets
    #[arg(long)]
    workbook: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // .env first so its values can feed the env-backed flags
    env_loader::load_env();
    env_logger::init();

    let cli = Cli::parse();
    let request = build_request(&cli)?;

    info!(
        "Starting conversion of {} file(s) into {:?}",
        request.inputs.len(),
        request.output_dir
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Converting ({} mode)...", request.mode));

    let result = convert_many(&request);
    spinner.finish_and_clear();
    let summary = result.context("Conversion failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.message());
        println!("nodes: {}", request.output_dir.join(&summary.nodes_file).display());
        println!("edges: {}", request.output_dir.join(&summary.edges_file).display());
        if let Some(workbook) = &summary.workbook_file {
            println!("workbook: {}", request.output_dir.join(workbook).display());
        }
    }
    Ok(())
}

fn build_request(cli: &Cli) -> Result<ConversionRequest> {
    let mut mapping = match &cli.mapping {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read mapping file {}", path.display()))?;
            FieldMapping::from_json(&raw)
                .with_context(|| format!("Failed to parse mapping file {}", path.display()))?
        }
        None => FieldMapping::default(),
    };
    for attr in &cli.extra_attrs {
        if !mapping.extra_attrs.contains(attr) {
            mapping.extra_attrs.push(attr.clone());
        }
    }

    let mode: GraphMode = cli.mode.parse()?;
    let mut request = ConversionRequest::new(cli.files.clone(), cli.output_dir.clone());
    request.format = OutputFormat::parse_lenient(&cli.format);
    request.mode = mode;
    request.mapping = mapping;
    request.pair = PairColumns {
        src_col: cli.src_col.clone(),
        dst_col: cli.dst_col.clone(),
        edge_label_col: cli.edge_label_col.clone(),
    };
    request.write_workbook = cli.workbook;
    Ok(request)
}
