use chrono::Local;
use log::info;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConvertResult;
use crate::models::{GraphMode, GraphTables, OutputFormat};

/// Output file names for a format, before collision probing.
pub fn output_names(format: OutputFormat) -> (&'static str, &'static str) {
    match format {
        OutputFormat::Gephi => ("nodes_gephi.csv", "edges_gephi.csv"),
        OutputFormat::Kumu => ("nodes_kumu.csv", "edges_kumu.csv"),
    }
}

/// Header row as the target tool expects it. Kumu wants `id`, `from` and `to`.
pub fn headers_for_format(columns: &[String], format: OutputFormat) -> Vec<String> {
    columns
        .iter()
        .map(|column| match (format, column.as_str()) {
            (OutputFormat::Kumu, "Id") => "id".to_string(),
            (OutputFormat::Kumu, "Source") => "from".to_string(),
            (OutputFormat::Kumu, "Target") => "to".to_string(),
            _ => column.clone(),
        })
        .collect()
}

/// First free path for `filename` in `folder`: `name.ext`, then `name_1.ext`, `name_2.ext`, ...
pub fn unique_path(folder: &Path, filename: &str) -> PathBuf {
    let candidate = folder.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (base, ext) = match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], &filename[idx..]),
        _ => (filename, ""),
    };
    let mut i = 1u32;
    loop {
        let candidate = folder.join(format!("{}_{}{}", base, i, ext));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Writes the node and edge CSVs into `output_dir` and returns their file names.
pub fn write_graph_csvs(
    output_dir: &Path,
    format: OutputFormat,
    tables: &GraphTables,
) -> ConvertResult<(String, String)> {
    fs::create_dir_all(output_dir)?;
    let (nodes_name, edges_name) = output_names(format);

    let nodes_path = unique_path(output_dir, nodes_name);
    write_csv(
        &nodes_path,
        &headers_for_format(&tables.node_columns, format),
        &tables.node_rows,
    )?;
    info!("Wrote {} nodes to {:?}", tables.node_rows.len(), nodes_path);

    let edges_path = unique_path(output_dir, edges_name);
    write_csv(
        &edges_path,
        &headers_for_format(&tables.edge_columns, format),
        &tables.edge_rows,
    )?;
    info!("Wrote {} edges to {:?}", tables.edge_rows.len(), edges_path);

    Ok((file_name_of(&nodes_path), file_name_of(&edges_path)))
}

fn write_csv(path: &Path, headers: &[String], rows: &[Vec<String>]) -> ConvertResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Run details shown on the workbook's "Summary" sheet.
pub struct WorkbookSummary<'a> {
    pub mode: GraphMode,
    pub format: OutputFormat,
    pub inputs: &'a [PathBuf],
}

/// Writes a workbook with "Nodes", "Edges" and "Summary" sheets and returns its file name.
pub fn write_workbook(
    output_dir: &Path,
    tables: &GraphTables,
    summary: &WorkbookSummary<'_>,
) -> ConvertResult<String> {
    fs::create_dir_all(output_dir)?;
    let path = unique_path(output_dir, &format!("graph_{}.xlsx", summary.format));
    info!("Initializing Excel workbook for file: {:?}", path);
    let mut workbook = Workbook::new();

    let header_format = Format::new().set_bold();

    let node_sheet = workbook.add_worksheet();
    node_sheet.set_name("Nodes")?;
    write_table_sheet(
        node_sheet,
        &headers_for_format(&tables.node_columns, summary.format),
        &tables.node_rows,
        &header_format,
    )?;

    let edge_sheet = workbook.add_worksheet();
    edge_sheet.set_name("Edges")?;
    write_table_sheet(
        edge_sheet,
        &headers_for_format(&tables.edge_columns, summary.format),
        &tables.edge_rows,
        &header_format,
    )?;

    let summary_sheet = workbook.add_worksheet();
    write_summary_sheet(summary_sheet, tables, summary, &header_format)?;

    info!("Saving Excel workbook...");
    workbook.save(&path)?;
    info!("Excel file saved successfully to {:?}", path);
    Ok(file_name_of(&path))
}

/// Header row plus data rows; the `weight` column is written as numbers.
fn write_table_sheet(
    sheet: &mut Worksheet,
    headers: &[String],
    rows: &[Vec<String>],
    header_format: &Format,
) -> ConvertResult<()> {
    for (col_num, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col_num as u16, header, header_format)?;
    }
    let weight_col = headers.iter().position(|h| h == "weight");

    for (row_num, row) in rows.iter().enumerate() {
        let current_row = (row_num + 1) as u32; // +1 for header row
        for (col_num, value) in row.iter().enumerate() {
            let numeric = if Some(col_num) == weight_col {
                value.parse::<f64>().ok()
            } else {
                None
            };
            match numeric {
                Some(number) => sheet.write_number(current_row, col_num as u16, number)?,
                None => sheet.write_string(current_row, col_num as u16, value)?,
            };
        }
    }
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    tables: &GraphTables,
    summary: &WorkbookSummary<'_>,
    header_format: &Format,
) -> ConvertResult<()> {
    sheet.set_name("Summary")?;
    sheet.set_column_width(0, 20)?;
    sheet.set_column_width(1, 40)?;

    sheet.write_string_with_format(0, 0, "Metric", header_format)?;
    sheet.write_string_with_format(0, 1, "Value", header_format)?;

    let mut current_row = 1u32;
    sheet.write_string(current_row, 0, "Graph mode")?;
    sheet.write_string(current_row, 1, summary.mode.as_str())?;
    current_row += 1;
    sheet.write_string(current_row, 0, "Format")?;
    sheet.write_string(current_row, 1, summary.format.as_str())?;
    current_row += 1;
    sheet.write_string(current_row, 0, "Nodes")?;
    sheet.write_number(current_row, 1, tables.node_rows.len() as f64)?;
    current_row += 1;
    sheet.write_string(current_row, 0, "Edges")?;
    sheet.write_number(current_row, 1, tables.edge_rows.len() as f64)?;
    current_row += 1;

    for input in summary.inputs {
        sheet.write_string(current_row, 0, "Input file")?;
        sheet.write_string(current_row, 1, file_name_of(input))?;
        current_row += 1;
    }

    current_row += 1;
    sheet.write_string(current_row, 0, "Generated")?;
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    sheet.write_string(current_row, 1, &timestamp)?;
    Ok(())
}
