// converter.rs
//! Conversion entry point: merge inputs, build the requested graph, export it.

use log::{error, info};
use std::path::Path;

use crate::custom_pair::build_custom_pair_graph;
use crate::error::{ConvertError, ConvertResult};
use crate::export_writer::{write_graph_csvs, write_workbook, WorkbookSummary};
use crate::graph_assembly::build_org_event_graph;
use crate::models::{
    ConversionRequest, ConversionSummary, FileInspection, GraphMode, GraphTables,
};
use crate::table_merge::{merge_files, read_one, SOURCE_FILE_COLUMN};

/// Runs one conversion. Specific failures (bad input files, unresolvable
/// fields, bad mapping) are returned as-is; anything else is logged and
/// reported as [`ConvertError::Conversion`].
pub fn convert_many(request: &ConversionRequest) -> ConvertResult<ConversionSummary> {
    run_conversion(request).map_err(|e| at_boundary(e, "conversion"))
}

/// Merges the inputs and builds the node/edge tables without writing anything.
pub fn build_tables(request: &ConversionRequest) -> ConvertResult<GraphTables> {
    request.mapping.validate()?;
    let table = merge_files(&request.inputs)?;

    let tables = match request.mode {
        GraphMode::CustomAb => {
            build_custom_pair_graph(&table, &request.pair, &request.mapping)?.into_tables()
        }
        GraphMode::OrgOrg => build_org_event_graph(&table, &request.mapping)?
            .retain_org_org()
            .into_tables(),
        GraphMode::OrgEvent => build_org_event_graph(&table, &request.mapping)?.into_tables(),
    };
    Ok(tables)
}

fn run_conversion(request: &ConversionRequest) -> ConvertResult<ConversionSummary> {
    info!(
        "Converting {} file(s): mode={}, format={}",
        request.inputs.len(),
        request.mode,
        request.format
    );
    let tables = build_tables(request)?;

    let (nodes_file, edges_file) = write_graph_csvs(&request.output_dir, request.format, &tables)?;
    let workbook_file = if request.write_workbook {
        let summary = WorkbookSummary {
            mode: request.mode,
            format: request.format,
            inputs: &request.inputs,
        };
        Some(write_workbook(&request.output_dir, &tables, &summary)?)
    } else {
        None
    };

    let summary = ConversionSummary {
        nodes_file,
        edges_file,
        workbook_file,
        node_count: tables.node_rows.len(),
        edge_count: tables.edge_rows.len(),
        format: request.format,
        mode: request.mode,
    };
    info!("{}", summary.message());
    Ok(summary)
}

/// Column names (provenance excluded) and row count of a single file.
pub fn inspect_file(path: &Path) -> ConvertResult<FileInspection> {
    let inspection = read_one(path).map(|table| FileInspection {
        columns: table
            .columns
            .iter()
            .filter(|c| c.as_str() != SOURCE_FILE_COLUMN)
            .cloned()
            .collect(),
        row_count: table.len(),
    });
    inspection.map_err(|e| at_boundary(e, "inspection"))
}

fn at_boundary(err: ConvertError, operation: &str) -> ConvertError {
    if err.is_specific() {
        info!("{} rejected: {}", operation, err);
        return err;
    }
    error!("{} failed: {}: {}", operation, err.kind(), err);
    ConvertError::Conversion {
        kind: err.kind().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn inspection_hides_provenance_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("responses.csv");
        fs::write(&path, "orgName,eventId\nAcme,E1\nBeta,E1\n").unwrap();
        let inspection = inspect_file(&path).unwrap();
        assert_eq!(inspection.columns, vec!["orgName", "eventId"]);
        assert_eq!(inspection.row_count, 2);
    }

    #[test]
    fn io_failures_are_wrapped_as_generic() {
        let err = at_boundary(
            ConvertError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")),
            "conversion",
        );
        match err {
            ConvertError::Conversion { kind, message } => {
                assert_eq!(kind, "IoError");
                assert!(message.contains("disk full"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn specific_failures_pass_through() {
        let err = at_boundary(ConvertError::NoReadableInput, "conversion");
        assert!(matches!(err, ConvertError::NoReadableInput));
    }

    #[test]
    fn custom_mode_without_columns_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pairs.csv");
        fs::write(&path, "A,B\nx,y\n").unwrap();
        let mut request = ConversionRequest::new(vec![path], dir.path().join("out"));
        request.mode = GraphMode::CustomAb;
        assert!(matches!(
            convert_many(&request),
            Err(ConvertError::MissingPairColumns)
        ));
        assert!(!dir.path().join("out").exists());
    }
}
