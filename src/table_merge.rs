// table_merge.rs
use calamine::{open_workbook_auto, Data, DataType, Reader};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, ConvertResult};

/// Provenance column added to every loaded row.
pub const SOURCE_FILE_COLUMN: &str = "__source_file__";

pub const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "xlsx"];

/// Rows of string cells under a shared header. Every row has exactly
/// `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value; out-of-range positions read as empty.
    pub fn value(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn column_values(&self, column: usize) -> Vec<String> {
        (0..self.rows.len())
            .map(|row| self.value(row, column).to_string())
            .collect()
    }

    /// Rearranges cells to `columns`, filling columns this table lacks with "".
    fn reindex(self, columns: &[String]) -> Table {
        let positions: Vec<Option<usize>> =
            columns.iter().map(|c| self.column_index(c)).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|pos| pos.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Table {
            columns: columns.to_vec(),
            rows,
        }
    }
}

/// Rejects paths whose extension is not `.csv` or `.xlsx` (case-insensitive).
pub fn validate_extension(path: &Path) -> ConvertResult<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ALLOWED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)) => Ok(()),
        _ => Err(ConvertError::UnsupportedFileType {
            path: path.display().to_string(),
            allowed: ALLOWED_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect(),
        }),
    }
}

/// Loads one file into a table with trimmed headers and a provenance column.
pub fn read_one(path: &Path) -> ConvertResult<Table> {
    validate_extension(path)?;
    if !path.exists() {
        return Err(ConvertError::FileNotFound(path.to_path_buf()));
    }

    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);

    let (raw_headers, raw_rows) = if is_xlsx {
        read_xlsx(path)?
    } else {
        read_csv(path)?
    };

    let mut columns = clean_headers(raw_headers);
    let width = columns.len();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(raw_rows.len());
    for (line, mut row) in raw_rows.into_iter().enumerate() {
        if row.len() > width {
            warn!(
                "{}: row {} has {} cells but only {} columns; extra cells dropped",
                path.display(),
                line + 2,
                row.len(),
                width
            );
        }
        row.resize(width, String::new());
        rows.push(row);
    }

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    columns.push(SOURCE_FILE_COLUMN.to_string());
    for row in rows.iter_mut() {
        row.push(source_name.clone());
    }

    info!("Loaded {} rows ({} columns) from {}", rows.len(), width, path.display());
    Ok(Table { columns, rows })
}

/// Reads every path and concatenates them over the sorted union of their columns.
pub fn merge_files(paths: &[PathBuf]) -> ConvertResult<Table> {
    // every path is checked before any file is parsed
    for path in paths {
        validate_extension(path)?;
        if !path.exists() {
            return Err(ConvertError::FileNotFound(path.clone()));
        }
    }
    let frames = paths
        .iter()
        .map(|path| read_one(path))
        .collect::<ConvertResult<Vec<Table>>>()?;

    if frames.is_empty() {
        return Err(ConvertError::NoReadableInput);
    }

    let all_columns: Vec<String> = frames
        .iter()
        .flat_map(|f| f.columns.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    debug!("Merged column union: {:?}", all_columns);

    let mut merged = Table {
        columns: all_columns.clone(),
        rows: Vec::new(),
    };
    for frame in frames {
        merged.rows.extend(frame.reindex(&all_columns).rows);
    }

    info!(
        "Merged {} file(s) into {} rows over {} columns",
        paths.len(),
        merged.len(),
        merged.columns.len()
    );
    Ok(merged)
}

/// Trims names, names blank headers `Unnamed: <i>` and suffixes repeats `.1`, `.2`, ...
/// A suffixed name that collides again is suffixed again (`a.1.1`), so names stay unique.
fn clean_headers(raw: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut cleaned = Vec::with_capacity(raw.len());
    for (idx, header) in raw.into_iter().enumerate() {
        let trimmed = header.trim_start_matches('\u{feff}').trim().to_string();
        let mut name = if trimmed.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            trimmed
        };
        let mut count = counts.get(&name).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(name.clone(), count + 1);
            name = format!("{}.{}", name, count);
            count = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), count + 1);
        cleaned.push(name);
    }
    cleaned
}

fn read_csv(path: &Path) -> ConvertResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

fn read_xlsx(path: &Path) -> ConvertResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = match workbook.sheet_names().first().cloned() {
        Some(name) => name,
        None => {
            warn!("{} contains no worksheets", path.display());
            return Ok((Vec::new(), Vec::new()));
        }
    };
    let range = workbook.worksheet_range(&sheet_name)?;
    debug!("Reading worksheet '{}' from {}", sheet_name, path.display());

    let mut rows_iter = range.rows();
    let headers = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => return Ok((Vec::new(), Vec::new())),
    };
    let rows = rows_iter
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok((headers, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn rejects_unsupported_extension_before_reading() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "data.txt", "a,b\n1,2\n");
        let err = merge_files(&[path]).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFileType { .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = merge_files(&[dir.path().join("absent.csv")]).unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound(_)));
    }

    #[test]
    fn empty_input_list_is_an_error() {
        assert!(matches!(merge_files(&[]), Err(ConvertError::NoReadableInput)));
    }

    #[test]
    fn headers_are_trimmed_and_disambiguated() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", " orgName ,sector,,sector\nAcme,Health,x,Tech\n");
        let table = read_one(&path).unwrap();
        assert_eq!(
            table.columns,
            vec!["orgName", "sector", "Unnamed: 2", "sector.1", SOURCE_FILE_COLUMN]
        );
        assert_eq!(table.rows[0], vec!["Acme", "Health", "x", "Tech", "a.csv"]);
    }

    #[test]
    fn suffixed_header_collisions_stay_unique() {
        let raw = ["a", "a", "a.1", "a"].iter().map(|h| h.to_string()).collect();
        assert_eq!(clean_headers(raw), vec!["a", "a.1", "a.1.1", "a.2"]);

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "a,a,a.1\n1,2,3\n");
        let table = read_one(&path).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", "3", "a.csv"]);
        assert_eq!(table.value(0, table.column_index("a.1.1").unwrap()), "3");
    }

    #[test]
    fn short_rows_are_padded() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "orgName,sector,addressCity\nAcme\n");
        let table = read_one(&path).unwrap();
        assert_eq!(table.rows[0], vec!["Acme", "", "", "a.csv"]);
    }

    #[test]
    fn merge_unions_columns_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "first.csv", "orgName,eventId\nAcme,E1\n");
        let second = write(&dir, "second.csv", "sector,orgName\nHealth,Beta\n");
        let merged = merge_files(&[first, second]).unwrap();

        assert_eq!(
            merged.columns,
            vec![SOURCE_FILE_COLUMN, "eventId", "orgName", "sector"]
        );
        assert_eq!(merged.rows[0], vec!["first.csv", "E1", "Acme", ""]);
        assert_eq!(merged.rows[1], vec!["second.csv", "", "Beta", "Health"]);
    }
}
