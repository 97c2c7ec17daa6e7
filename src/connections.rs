// connections.rs
//! Self-reported organization-to-organization connections embedded as JSON
//! in a response column. Bad data is skipped per row or per descriptor and
//! never fails the conversion.

use log::{debug, info};
use serde_json::Value;
use std::fmt;

use crate::entity_resolver::{org_node_id, EntityResolver, ResponseColumns};
use crate::models::{EdgeRecord, NodeRecord, CONNECTION_EDGE, ORG_NODE_TYPE};
use crate::normalize::{canonical_key, normalize, pretty_label};

const TARGET_KEYS: [&str; 5] = [
    "organization",
    "orgName",
    "connectionOrg",
    "connectionOrganization",
    "connection_organization",
];
const TYPE_KEYS: [&str; 2] = ["connectionType", "type"];
const DESCRIPTION_KEYS: [&str; 2] = ["description", "notes"];

/// Why a connections cell or descriptor was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionParseError {
    Empty,
    InvalidJson(String),
    NotAList,
    NotAnObject,
    MissingOrganization,
}

impl fmt::Display for ConnectionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionParseError::Empty => write!(f, "empty connections value"),
            ConnectionParseError::InvalidJson(e) => write!(f, "invalid JSON: {}", e),
            ConnectionParseError::NotAList => write!(f, "connections value is not a list"),
            ConnectionParseError::NotAnObject => write!(f, "descriptor is not an object"),
            ConnectionParseError::MissingOrganization => {
                write!(f, "descriptor names no target organization")
            }
        }
    }
}

impl std::error::Error for ConnectionParseError {}

/// One reported connection after alias resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub organization: String,
    pub connection_type: String,
    pub description: String,
}

/// Parses a raw connections cell into a list of descriptors.
///
/// A JSON string result is parsed once more to unwrap double-encoded data.
/// A single object is treated as a one-element list.
pub fn parse_connections(raw: &str) -> Result<Vec<Value>, ConnectionParseError> {
    let raw = normalize(raw);
    if raw.is_empty() || raw == "[]" {
        return Err(ConnectionParseError::Empty);
    }

    let parsed = parse_json(&raw)?;
    let parsed = match parsed {
        Value::String(inner) => parse_json(&inner)?,
        other => other,
    };

    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![parsed]),
        _ => Err(ConnectionParseError::NotAList),
    }
}

fn parse_json(raw: &str) -> Result<Value, ConnectionParseError> {
    serde_json::from_str(raw).map_err(|e| ConnectionParseError::InvalidJson(e.to_string()))
}

/// Reads target, type and description from the recognized alias keys.
pub fn read_descriptor(value: &Value) -> Result<ConnectionDescriptor, ConnectionParseError> {
    let object = value.as_object().ok_or(ConnectionParseError::NotAnObject)?;
    let first_text = |keys: &[&str]| {
        keys.iter()
            .filter_map(|key| object.get(*key).and_then(text_of))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    };

    let organization = first_text(&TARGET_KEYS[..]);
    if canonical_key(&organization).is_empty() {
        return Err(ConnectionParseError::MissingOrganization);
    }
    Ok(ConnectionDescriptor {
        organization,
        connection_type: first_text(&TYPE_KEYS[..]),
        description: first_text(&DESCRIPTION_KEYS[..]),
    })
}

/// Strings and numbers count as text; everything else reads as absent.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(normalize(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stub organization nodes for connection targets plus one edge per descriptor.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOutput {
    pub stubs: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// Walks every row's connections cell in row order.
pub fn collect_connections(
    columns: &ResponseColumns,
    entities: &EntityResolver<'_>,
) -> ConnectionOutput {
    let mut output = ConnectionOutput::default();
    let Some(raw_values) = columns.connections.as_ref() else {
        return output;
    };

    let mut skipped_rows = 0usize;
    let mut skipped_descriptors = 0usize;
    for (row, raw) in raw_values.iter().enumerate() {
        let base_key = entities.org_key(row);
        if base_key.is_empty() {
            continue;
        }

        let descriptors = match parse_connections(raw) {
            Ok(items) => items,
            Err(ConnectionParseError::Empty) => continue,
            Err(e) => {
                debug!("Row {}: skipping connections ({})", row, e);
                skipped_rows += 1;
                continue;
            }
        };

        let source = org_node_id(base_key);
        let event_id = normalize(&columns.event_id[row]);
        let event_date = normalize(&columns.event_date[row]);

        for value in &descriptors {
            let descriptor = match read_descriptor(value) {
                Ok(d) => d,
                Err(e) => {
                    debug!("Row {}: skipping connection descriptor ({})", row, e);
                    skipped_descriptors += 1;
                    continue;
                }
            };

            let target = org_node_id(&canonical_key(&descriptor.organization));
            output.stubs.push(NodeRecord {
                id: target.clone(),
                label: pretty_label(&descriptor.organization),
                node_type: ORG_NODE_TYPE.to_string(),
                extras: vec![String::new(); columns.extras.len()],
                ..Default::default()
            });
            output.edges.push(EdgeRecord {
                source: source.clone(),
                target,
                edge_type: CONNECTION_EDGE.to_string(),
                event_id: event_id.clone(),
                event_date: event_date.clone(),
                connection_type: descriptor.connection_type,
                description: descriptor.description,
                weight: 1,
            });
        }
    }

    info!(
        "Collected {} connection edges ({} rows and {} descriptors skipped as malformed)",
        output.edges.len(),
        skipped_rows,
        skipped_descriptors
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_columns(org: &str, connections: &str) -> ResponseColumns {
        ResponseColumns {
            org_name: vec![org.to_string()],
            sector: vec![String::new()],
            city: vec![String::new()],
            state: vec![String::new()],
            country: vec![String::new()],
            event_id: vec!["E1".to_string()],
            event_name: vec!["Summit".to_string()],
            event_date: vec!["2024-05-01".to_string()],
            connections: Some(vec![connections.to_string()]),
            extras: Vec::new(),
        }
    }

    #[test]
    fn parses_plain_list() {
        let items = parse_connections(r#"[{"organization":"Beta Org"}]"#).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn unwraps_double_encoded_list() {
        let encoded = serde_json::to_string(r#"[{"orgName":"Beta Org"},{"orgName":"Gamma"}]"#)
            .unwrap();
        let items = parse_connections(&encoded).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn single_object_becomes_one_element_list() {
        let items = parse_connections(r#"{"organization":"Beta Org"}"#).unwrap();
        assert_eq!(items, vec![json!({"organization": "Beta Org"})]);
    }

    #[test]
    fn rejects_garbage_and_non_lists() {
        assert!(matches!(
            parse_connections("not valid json"),
            Err(ConnectionParseError::InvalidJson(_))
        ));
        assert_eq!(parse_connections("42"), Err(ConnectionParseError::NotAList));
        assert_eq!(parse_connections("  [] "), Err(ConnectionParseError::Empty));
        assert_eq!(parse_connections(""), Err(ConnectionParseError::Empty));
    }

    #[test]
    fn descriptor_aliases_resolve_in_order() {
        let descriptor = read_descriptor(&json!({
            "organization": "",
            "connectionOrg": "Beta Org",
            "type": "partner",
            "notes": "shared grant"
        }))
        .unwrap();
        assert_eq!(descriptor.organization, "Beta Org");
        assert_eq!(descriptor.connection_type, "partner");
        assert_eq!(descriptor.description, "shared grant");
    }

    #[test]
    fn descriptor_without_target_is_rejected() {
        assert_eq!(
            read_descriptor(&json!({"connectionType": "funder"})),
            Err(ConnectionParseError::MissingOrganization)
        );
        assert_eq!(
            read_descriptor(&json!("Beta Org")),
            Err(ConnectionParseError::NotAnObject)
        );
    }

    #[test]
    fn collects_edge_and_stub_for_target() {
        let cols = row_columns(
            "Acme Inc",
            r#"[{"organization":"Beta Org","connectionType":"funder"}]"#,
        );
        let entities = EntityResolver::new(&cols);
        let output = collect_connections(&cols, &entities);

        assert_eq!(output.edges.len(), 1);
        let edge = &output.edges[0];
        assert_eq!(edge.source, "org_acme_inc");
        assert_eq!(edge.target, "org_beta_org");
        assert_eq!(edge.connection_type, "funder");
        assert_eq!(edge.event_id, "E1");
        assert_eq!(edge.event_date, "2024-05-01");

        assert_eq!(output.stubs.len(), 1);
        assert_eq!(output.stubs[0].id, "org_beta_org");
        assert_eq!(output.stubs[0].label, "Beta Org");
        assert_eq!(output.stubs[0].org_sector, "");
    }

    #[test]
    fn bad_descriptor_does_not_affect_siblings() {
        let cols = row_columns(
            "Acme Inc",
            r#"[{"organization":"Beta Org"}, "oops", {"notes":"no target"}, {"orgName":"Gamma"}]"#,
        );
        let entities = EntityResolver::new(&cols);
        let output = collect_connections(&cols, &entities);
        let targets: Vec<&str> = output.edges.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["org_beta_org", "org_gamma"]);
    }

    #[test]
    fn malformed_row_is_silently_skipped() {
        let cols = row_columns("Acme Inc", "not valid json");
        let entities = EntityResolver::new(&cols);
        let output = collect_connections(&cols, &entities);
        assert!(output.edges.is_empty());
        assert!(output.stubs.is_empty());
    }

    #[test]
    fn rows_without_primary_org_are_skipped() {
        let cols = row_columns("  ", r#"[{"organization":"Beta Org"}]"#);
        let entities = EntityResolver::new(&cols);
        assert!(collect_connections(&cols, &entities).edges.is_empty());
    }
}
