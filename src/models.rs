use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConvertError, ConvertResult};

pub const ORG_NODE_TYPE: &str = "org";
pub const EVENT_NODE_TYPE: &str = "event";
pub const ATTENDANCE_EDGE: &str = "attendance";
pub const CONNECTION_EDGE: &str = "connection";

/// Base node columns for the organization/event schema.
pub const NODE_COLUMNS: [&str; 10] = [
    "Id",
    "Label",
    "type",
    "org_type",
    "org_sector",
    "city",
    "state",
    "country",
    "event_date",
    "event_id",
];

pub const EDGE_COLUMNS: [&str; 8] = [
    "Source",
    "Target",
    "edge_type",
    "event_id",
    "event_date",
    "connection_type",
    "description",
    "weight",
];

pub const PAIR_NODE_COLUMNS: [&str; 3] = ["Id", "Label", "type"];
pub const PAIR_EDGE_COLUMNS: [&str; 4] = ["Source", "Target", "edge_type", "weight"];

/// Logical input fields the organization/event builder reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    OrgName,
    Sector,
    AddressCity,
    AddressState,
    AddressCountry,
    EventId,
    EventName,
    EventDate,
    Connections,
}

impl Field {
    /// Logical name as used in mapping files.
    pub fn logical_name(&self) -> &'static str {
        match self {
            Field::OrgName => "orgName",
            Field::Sector => "sector",
            Field::AddressCity => "addressCity",
            Field::AddressState => "addressState",
            Field::AddressCountry => "addressCountry",
            Field::EventId => "eventId",
            Field::EventName => "eventName",
            Field::EventDate => "eventDate",
            Field::Connections => "connections",
        }
    }
}

/// Caller-supplied mapping from logical fields to actual input columns,
/// plus organization attributes to carry through to the node table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMapping {
    pub org_name: Option<String>,
    pub sector: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub event_date: Option<String>,
    pub connections: Option<String>,
    pub extra_attrs: Vec<String>,
}

impl FieldMapping {
    /// Mapped column for a field. Blank entries count as unmapped.
    pub fn column_for(&self, field: Field) -> Option<&str> {
        let mapped = match field {
            Field::OrgName => &self.org_name,
            Field::Sector => &self.sector,
            Field::AddressCity => &self.address_city,
            Field::AddressState => &self.address_state,
            Field::AddressCountry => &self.address_country,
            Field::EventId => &self.event_id,
            Field::EventName => &self.event_name,
            Field::EventDate => &self.event_date,
            Field::Connections => &self.connections,
        };
        mapped.as_deref().filter(|column| !column.trim().is_empty())
    }

    pub fn from_json(raw: &str) -> ConvertResult<Self> {
        let mapping: FieldMapping = serde_json::from_str(raw)
            .map_err(|e| ConvertError::InvalidMapping(e.to_string()))?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Checks the extra attribute list: names must be non-blank, unique, and
    /// must not shadow one of the fixed node columns.
    pub fn validate(&self) -> ConvertResult<()> {
        let mut seen = HashSet::new();
        for attr in &self.extra_attrs {
            if attr.trim().is_empty() {
                return Err(ConvertError::InvalidMapping(
                    "extraAttrs contains a blank attribute name".to_string(),
                ));
            }
            if NODE_COLUMNS.contains(&attr.as_str()) || PAIR_NODE_COLUMNS.contains(&attr.as_str()) {
                return Err(ConvertError::InvalidMapping(format!(
                    "extra attribute '{}' collides with a built-in node column",
                    attr
                )));
            }
            if !seen.insert(attr.as_str()) {
                return Err(ConvertError::InvalidMapping(format!(
                    "extra attribute '{}' is listed more than once",
                    attr
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Gephi,
    Kumu,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognized falls back to Gephi.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "kumu" => OutputFormat::Kumu,
            _ => OutputFormat::Gephi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Gephi => "gephi",
            OutputFormat::Kumu => "kumu",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
    #[default]
    OrgEvent,
    OrgOrg,
    CustomAb,
}

impl GraphMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphMode::OrgEvent => "org_event",
            GraphMode::OrgOrg => "org_org",
            GraphMode::CustomAb => "custom_ab",
        }
    }
}

impl FromStr for GraphMode {
    type Err = ConvertError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "" | "org_event" => Ok(GraphMode::OrgEvent),
            "org_org" => Ok(GraphMode::OrgOrg),
            "custom_ab" => Ok(GraphMode::CustomAb),
            other => Err(ConvertError::UnknownGraphMode(other.to_string())),
        }
    }
}

impl fmt::Display for GraphMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column choices for the generic source/target graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairColumns {
    pub src_col: Option<String>,
    pub dst_col: Option<String>,
    pub edge_label_col: Option<String>,
}

/// One conversion run: inputs, output shape, and where to write.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub mode: GraphMode,
    pub mapping: FieldMapping,
    pub pair: PairColumns,
    pub write_workbook: bool,
}

impl ConversionRequest {
    pub fn new(inputs: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        ConversionRequest {
            inputs,
            output_dir: output_dir.into(),
            format: OutputFormat::default(),
            mode: GraphMode::default(),
            mapping: FieldMapping::default(),
            pair: PairColumns::default(),
            write_workbook: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub nodes_file: String,
    pub edges_file: String,
    pub workbook_file: Option<String>,
    pub node_count: usize,
    pub edge_count: usize,
    pub format: OutputFormat,
    pub mode: GraphMode,
}

impl ConversionSummary {
    pub fn message(&self) -> String {
        format!(
            "Converted ({} nodes, {} edges) → format: {}",
            self.node_count,
            self.edge_count,
            self.format.as_str().to_uppercase()
        )
    }
}

/// Columns and row count of a single file, for building a mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInspection {
    pub columns: Vec<String>,
    pub row_count: usize,
}

// Graph records

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: String,
    pub label: String,
    pub node_type: String,
    pub org_type: String,
    pub org_sector: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub event_date: String,
    pub event_id: String,
    pub extras: Vec<String>,
}

impl NodeRecord {
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.id.clone(),
            self.label.clone(),
            self.node_type.clone(),
            self.org_type.clone(),
            self.org_sector.clone(),
            self.city.clone(),
            self.state.clone(),
            self.country.clone(),
            self.event_date.clone(),
            self.event_id.clone(),
        ];
        cells.extend(self.extras.iter().cloned());
        cells
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub edge_type: String,
    pub event_id: String,
    pub event_date: String,
    pub connection_type: String,
    pub description: String,
    pub weight: u64,
}

impl EdgeRecord {
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.source.clone(),
            self.target.clone(),
            self.edge_type.clone(),
            self.event_id.clone(),
            self.event_date.clone(),
            self.connection_type.clone(),
            self.description.clone(),
            self.weight.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairNode {
    pub id: String,
    pub label: String,
    pub node_type: String,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairEdge {
    pub source: String,
    pub target: String,
    pub edge_type: String,
    pub weight: u64,
}

/// Final header + row tables handed to the export writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphTables {
    pub node_columns: Vec<String>,
    pub node_rows: Vec<Vec<String>>,
    pub edge_columns: Vec<String>,
    pub edge_rows: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_reads_camel_case_json() {
        let mapping = FieldMapping::from_json(
            r#"{"orgName": "Organization", "eventId": "Conference ID", "extraAttrs": ["Website"]}"#,
        )
        .unwrap();
        assert_eq!(mapping.column_for(Field::OrgName), Some("Organization"));
        assert_eq!(mapping.column_for(Field::EventId), Some("Conference ID"));
        assert_eq!(mapping.column_for(Field::Sector), None);
        assert_eq!(mapping.extra_attrs, vec!["Website".to_string()]);
    }

    #[test]
    fn blank_mapping_entries_are_unmapped() {
        let mapping = FieldMapping {
            sector: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(mapping.column_for(Field::Sector), None);
    }

    #[test]
    fn mapping_validation_rejects_bad_extras() {
        let duplicate = FieldMapping {
            extra_attrs: vec!["Website".into(), "Website".into()],
            ..Default::default()
        };
        assert!(matches!(duplicate.validate(), Err(ConvertError::InvalidMapping(_))));

        let shadowing = FieldMapping {
            extra_attrs: vec!["Label".into()],
            ..Default::default()
        };
        assert!(matches!(shadowing.validate(), Err(ConvertError::InvalidMapping(_))));

        assert!(matches!(
            FieldMapping::from_json("[1, 2]"),
            Err(ConvertError::InvalidMapping(_))
        ));
    }

    #[test]
    fn format_parsing_falls_back_to_gephi() {
        assert_eq!(OutputFormat::parse_lenient(" KUMU "), OutputFormat::Kumu);
        assert_eq!(OutputFormat::parse_lenient("graphml"), OutputFormat::Gephi);
    }

    #[test]
    fn mode_parsing_rejects_unknown_modes() {
        assert_eq!("Org_Org".parse::<GraphMode>().unwrap(), GraphMode::OrgOrg);
        assert_eq!("".parse::<GraphMode>().unwrap(), GraphMode::OrgEvent);
        assert!(matches!(
            "tree".parse::<GraphMode>(),
            Err(ConvertError::UnknownGraphMode(_))
        ));
    }
}
