// graph_assembly.rs
use log::info;
use std::collections::BTreeMap;

use crate::column_resolver::ColumnResolver;
use crate::connections::collect_connections;
use crate::entity_resolver::{
    event_node_id, merge_organization_nodes, org_node_id, EntityResolver, ResponseColumns,
};
use crate::error::ConvertResult;
use crate::models::{
    EdgeRecord, FieldMapping, GraphTables, NodeRecord, ATTENDANCE_EDGE, CONNECTION_EDGE,
    EDGE_COLUMNS, NODE_COLUMNS, ORG_NODE_TYPE,
};
use crate::normalize::normalize;
use crate::table_merge::Table;

/// Organization/event graph before export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrgEventGraph {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub extra_attrs: Vec<String>,
}

impl OrgEventGraph {
    /// Keeps only organization nodes and connection edges.
    pub fn retain_org_org(mut self) -> Self {
        self.nodes.retain(|n| n.node_type == ORG_NODE_TYPE);
        self.edges.retain(|e| e.edge_type == CONNECTION_EDGE);
        info!(
            "Filtered to organization graph: {} nodes, {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        self
    }

    pub fn into_tables(self) -> GraphTables {
        let mut node_columns: Vec<String> = NODE_COLUMNS.iter().map(|c| c.to_string()).collect();
        node_columns.extend(self.extra_attrs.iter().cloned());
        GraphTables {
            node_columns,
            node_rows: self.nodes.iter().map(NodeRecord::cells).collect(),
            edge_columns: EDGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            edge_rows: self.edges.iter().map(EdgeRecord::cells).collect(),
        }
    }
}

/// Builds event nodes, organization nodes, attendance and connection edges
/// from a merged response table.
pub fn build_org_event_graph(
    table: &Table,
    mapping: &FieldMapping,
) -> ConvertResult<OrgEventGraph> {
    let resolver = ColumnResolver::new(table, mapping);
    let columns = ResponseColumns::extract(&resolver)?;
    let entities = EntityResolver::new(&columns);

    let event_nodes = entities.event_nodes();
    let mut org_nodes = entities.organization_nodes();

    let attendance = aggregate_edges(attendance_edges(&columns, &entities));

    let connections = collect_connections(&columns, &entities);
    // stubs go after the primary nodes so primary attributes win the merge
    org_nodes.extend(connections.stubs);
    let org_nodes = merge_organization_nodes(org_nodes);
    let connection_edges = aggregate_edges(connections.edges);

    info!(
        "Assembled graph: {} event nodes, {} organization nodes, \
         {} attendance edges, {} connection edges",
        event_nodes.len(),
        org_nodes.len(),
        attendance.len(),
        connection_edges.len()
    );

    let mut nodes = event_nodes;
    nodes.extend(org_nodes);
    let mut edges = attendance;
    edges.extend(connection_edges);

    Ok(OrgEventGraph {
        nodes,
        edges,
        extra_attrs: columns.extra_names(),
    })
}

/// One organization→event edge per row that names both.
pub fn attendance_edges(
    columns: &ResponseColumns,
    entities: &EntityResolver<'_>,
) -> Vec<EdgeRecord> {
    (0..columns.row_count())
        .filter_map(|row| {
            let org_key = entities.org_key(row);
            let event_key = entities.event_key(row);
            if org_key.is_empty() || event_key.is_empty() {
                return None;
            }
            Some(EdgeRecord {
                source: org_node_id(org_key),
                target: event_node_id(event_key),
                edge_type: ATTENDANCE_EDGE.to_string(),
                event_id: normalize(&columns.event_id[row]),
                event_date: normalize(&columns.event_date[row]),
                weight: 1,
                ..Default::default()
            })
        })
        .collect()
}

type EdgeIdentity = (String, String, String, String, String, String, String);

/// Collapses edges sharing their full identity tuple, summing weights.
/// Output is sorted by identity.
pub fn aggregate_edges(edges: Vec<EdgeRecord>) -> Vec<EdgeRecord> {
    let mut grouped: BTreeMap<EdgeIdentity, u64> = BTreeMap::new();
    for edge in edges {
        let identity = (
            edge.source,
            edge.target,
            edge.edge_type,
            edge.event_id,
            edge.event_date,
            edge.connection_type,
            edge.description,
        );
        *grouped.entry(identity).or_insert(0) += edge.weight;
    }
    grouped
        .into_iter()
        .map(|(identity, weight)| {
            let (source, target, edge_type, event_id, event_date, connection_type, description) =
                identity;
            EdgeRecord {
                source,
                target,
                edge_type,
                event_id,
                event_date,
                connection_type,
                description,
                weight,
            }
        })
        .collect()
}
