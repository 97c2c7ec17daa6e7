// entity_resolver.rs
//! Groups response rows into one organization node and one event node per
//! distinct canonical key.

use log::{debug, info};
use std::collections::BTreeMap;

use crate::column_resolver::ColumnResolver;
use crate::error::ConvertResult;
use crate::models::{Field, NodeRecord, EVENT_NODE_TYPE, ORG_NODE_TYPE};
use crate::normalize::{canonical_key, first_non_empty, most_common_non_empty, pretty_label, slug};

/// Field values pulled out of the merged table, one entry per row.
#[derive(Debug, Clone, Default)]
pub struct ResponseColumns {
    pub org_name: Vec<String>,
    pub sector: Vec<String>,
    pub city: Vec<String>,
    pub state: Vec<String>,
    pub country: Vec<String>,
    pub event_id: Vec<String>,
    pub event_name: Vec<String>,
    pub event_date: Vec<String>,
    /// `None` when the input has no connections column at all.
    pub connections: Option<Vec<String>>,
    /// Configured extra organization attributes, in mapping order.
    pub extras: Vec<(String, Vec<String>)>,
}

impl ResponseColumns {
    pub fn extract(resolver: &ColumnResolver<'_>) -> ConvertResult<Self> {
        let connections = match resolver.resolve(Field::Connections) {
            Some(_) => Some(resolver.column(Field::Connections, false)?),
            None => None,
        };

        let mut extras = Vec::new();
        for attr in &resolver.mapping().extra_attrs {
            extras.push((attr.clone(), resolver.column_by_name(attr, false)?));
        }

        Ok(ResponseColumns {
            org_name: resolver.column(Field::OrgName, true)?,
            sector: resolver.column(Field::Sector, false)?,
            city: resolver.column(Field::AddressCity, false)?,
            state: resolver.column(Field::AddressState, false)?,
            country: resolver.column(Field::AddressCountry, false)?,
            event_id: resolver.column(Field::EventId, true)?,
            event_name: resolver.column(Field::EventName, true)?,
            event_date: resolver.column(Field::EventDate, true)?,
            connections,
            extras,
        })
    }

    pub fn row_count(&self) -> usize {
        self.org_name.len()
    }

    pub fn extra_names(&self) -> Vec<String> {
        self.extras.iter().map(|(name, _)| name.clone()).collect()
    }
}

pub fn org_node_id(key: &str) -> String {
    format!("org_{}", slug(key))
}

pub fn event_node_id(key: &str) -> String {
    format!("evt_{}", slug(key))
}

/// Canonical identities per row, plus the two node groupings.
pub struct EntityResolver<'a> {
    columns: &'a ResponseColumns,
    org_keys: Vec<String>,
    event_keys: Vec<String>,
}

impl<'a> EntityResolver<'a> {
    pub fn new(columns: &'a ResponseColumns) -> Self {
        let org_keys = columns.org_name.iter().map(|n| canonical_key(n)).collect();
        // event id is the preferred identity, the name is the fallback
        let event_keys = columns
            .event_id
            .iter()
            .zip(&columns.event_name)
            .map(|(id, name)| {
                let key = canonical_key(id);
                if key.is_empty() {
                    canonical_key(name)
                } else {
                    key
                }
            })
            .collect();
        EntityResolver {
            columns,
            org_keys,
            event_keys,
        }
    }

    pub fn org_key(&self, row: usize) -> &str {
        &self.org_keys[row]
    }

    pub fn event_key(&self, row: usize) -> &str {
        &self.event_keys[row]
    }

    /// One node per event key; each attribute is the first non-empty value in row order.
    pub fn event_nodes(&self) -> Vec<NodeRecord> {
        let groups = group_rows(&self.event_keys);
        let cols = self.columns;
        let extras_len = cols.extras.len();

        let nodes: Vec<NodeRecord> = groups
            .into_iter()
            .map(|(key, rows)| {
                let pick = |values: &Vec<String>| first_non_empty(rows.iter().map(|&r| &values[r]));
                let event_id = pick(&cols.event_id);
                let event_name = pick(&cols.event_name);
                let label_source = if event_name.is_empty() { &event_id } else { &event_name };
                NodeRecord {
                    id: event_node_id(key),
                    label: pretty_label(label_source),
                    node_type: EVENT_NODE_TYPE.to_string(),
                    city: pick(&cols.city),
                    state: pick(&cols.state),
                    country: pick(&cols.country),
                    event_date: pick(&cols.event_date),
                    event_id,
                    extras: vec![String::new(); extras_len],
                    ..Default::default()
                }
            })
            .collect();

        info!("Resolved {} event nodes", nodes.len());
        nodes
    }

    /// One node per organization key; each attribute is the majority non-empty value.
    pub fn organization_nodes(&self) -> Vec<NodeRecord> {
        let groups = group_rows(&self.org_keys);
        let cols = self.columns;

        let nodes: Vec<NodeRecord> = groups
            .into_iter()
            .map(|(key, rows)| {
                let vote =
                    |values: &Vec<String>| most_common_non_empty(rows.iter().map(|&r| &values[r]));
                let label = vote(&cols.org_name);
                let label_source = if label.is_empty() { key } else { label.as_str() };
                debug!("Organization '{}' grouped from {} rows", key, rows.len());
                NodeRecord {
                    id: org_node_id(key),
                    label: pretty_label(label_source),
                    node_type: ORG_NODE_TYPE.to_string(),
                    org_sector: vote(&cols.sector),
                    city: vote(&cols.city),
                    state: vote(&cols.state),
                    country: vote(&cols.country),
                    extras: cols.extras.iter().map(|(_, values)| vote(values)).collect(),
                    ..Default::default()
                }
            })
            .collect();

        info!("Resolved {} organization nodes", nodes.len());
        nodes
    }
}

/// Row indices per non-empty key, keys in sorted order, rows in input order.
fn group_rows(keys: &[String]) -> BTreeMap<&str, Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, key) in keys.iter().enumerate() {
        if key.is_empty() {
            continue;
        }
        groups.entry(key.as_str()).or_default().push(row);
    }
    groups
}

/// Folds connection stubs into the primary organization nodes by node Id.
///
/// Fields take the first non-empty value in order, so nodes listed first
/// (the primary rows) win over stubs appended after them.
pub fn merge_organization_nodes(nodes: Vec<NodeRecord>) -> Vec<NodeRecord> {
    let mut by_id: BTreeMap<String, NodeRecord> = BTreeMap::new();
    for node in nodes {
        match by_id.get_mut(&node.id) {
            Some(existing) => fill_empty_fields(existing, node),
            None => {
                let id = node.id.clone();
                let mut node = node;
                node.node_type = ORG_NODE_TYPE.to_string();
                by_id.insert(id, node);
            }
        }
    }
    by_id.into_values().collect()
}

fn fill_empty_fields(target: &mut NodeRecord, other: NodeRecord) {
    fn fill(slot: &mut String, value: String) {
        if slot.trim().is_empty() && !value.trim().is_empty() {
            *slot = value;
        }
    }
    fill(&mut target.label, other.label);
    fill(&mut target.org_type, other.org_type);
    fill(&mut target.org_sector, other.org_sector);
    fill(&mut target.city, other.city);
    fill(&mut target.state, other.state);
    fill(&mut target.country, other.country);
    fill(&mut target.event_date, other.event_date);
    fill(&mut target.event_id, other.event_id);
    if target.extras.len() < other.extras.len() {
        target.extras.resize(other.extras.len(), String::new());
    }
    for (slot, value) in target.extras.iter_mut().zip(other.extras) {
        fill(slot, value);
    }
}
