// custom_pair.rs
//! Generic directed graph from two user-chosen columns, independent of the
//! organization/event schema.

use log::info;
use std::collections::{BTreeMap, HashMap};

use crate::column_resolver::ColumnResolver;
use crate::error::{ConvertError, ConvertResult};
use crate::models::{
    FieldMapping, GraphTables, PairColumns, PairEdge, PairNode, PAIR_EDGE_COLUMNS,
    PAIR_NODE_COLUMNS,
};
use crate::normalize::{canonical_key, first_non_empty, normalize, pretty_label, slug};
use crate::table_merge::Table;

const DEFAULT_EDGE_LABEL: &str = "connection";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairGraph {
    pub nodes: Vec<PairNode>,
    pub edges: Vec<PairEdge>,
    pub extra_attrs: Vec<String>,
}

impl PairGraph {
    pub fn into_tables(self) -> GraphTables {
        let mut node_columns: Vec<String> =
            PAIR_NODE_COLUMNS.iter().map(|c| c.to_string()).collect();
        node_columns.extend(self.extra_attrs.iter().cloned());
        let node_rows = self
            .nodes
            .into_iter()
            .map(|node| {
                let mut cells = vec![node.id, node.label, node.node_type];
                cells.extend(node.extras);
                cells
            })
            .collect();
        let edge_rows = self
            .edges
            .into_iter()
            .map(|edge| vec![edge.source, edge.target, edge.edge_type, edge.weight.to_string()])
            .collect();
        GraphTables {
            node_columns,
            node_rows,
            edge_columns: PAIR_EDGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            edge_rows,
        }
    }
}

pub fn pair_node_id(value: &str) -> String {
    format!("node_{}", slug(&canonical_key(value)))
}

struct NodeSlot {
    label: String,
    is_source: bool,
    is_target: bool,
}

/// Builds the source→target graph. Source and target columns are required;
/// the label column is optional and defaults each edge to "connection".
pub fn build_custom_pair_graph(
    table: &Table,
    pair: &PairColumns,
    mapping: &FieldMapping,
) -> ConvertResult<PairGraph> {
    let non_blank = |col: &Option<String>| {
        col.as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    };
    let (src_col, dst_col) = match (non_blank(&pair.src_col), non_blank(&pair.dst_col)) {
        (Some(src), Some(dst)) => (src, dst),
        _ => return Err(ConvertError::MissingPairColumns),
    };

    let resolver = ColumnResolver::new(table, mapping);
    let normalized = |values: Vec<String>| -> Vec<String> {
        values.iter().map(|v| normalize(v)).collect()
    };
    let sources = normalized(resolver.column_by_name(&src_col, true)?);
    let targets = normalized(resolver.column_by_name(&dst_col, true)?);
    let labels: Vec<String> = match non_blank(&pair.edge_label_col) {
        Some(label_col) => normalized(resolver.column_by_name(&label_col, false)?),
        None => vec![String::new(); table.len()],
    };

    let source_ids: Vec<Option<String>> = sources.iter().map(|v| non_empty_id(v)).collect();
    let target_ids: Vec<Option<String>> = targets.iter().map(|v| non_empty_id(v)).collect();

    // nodes in first-appearance order: all sources, then all targets
    let mut order: Vec<String> = Vec::new();
    let mut slots: HashMap<String, NodeSlot> = HashMap::new();
    let appearances = sources
        .iter()
        .zip(&source_ids)
        .map(|(value, id)| (value, id, true))
        .chain(targets.iter().zip(&target_ids).map(|(value, id)| (value, id, false)));
    for (value, id, from_source) in appearances {
        let Some(id) = id else { continue };
        let slot = slots.entry(id.clone()).or_insert_with(|| {
            order.push(id.clone());
            NodeSlot {
                label: pretty_label(value),
                is_source: false,
                is_target: false,
            }
        });
        if from_source {
            slot.is_source = true;
        } else {
            slot.is_target = true;
        }
    }

    let mut extras: Vec<(String, Vec<String>)> = Vec::new();
    for attr in &mapping.extra_attrs {
        extras.push((attr.clone(), resolver.column_by_name(attr, false)?));
    }
    let rows_by_id = if extras.is_empty() {
        HashMap::new()
    } else {
        rows_by_node(&source_ids, &target_ids)
    };

    let nodes: Vec<PairNode> = order
        .into_iter()
        .filter_map(|id| {
            let slot = slots.remove(&id)?;
            let node_type = match (slot.is_source, slot.is_target) {
                (true, true) => "both",
                (true, false) => "source",
                _ => "target",
            };
            let rows = rows_by_id.get(id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let extras = extras
                .iter()
                .map(|(_, values)| first_non_empty(rows.iter().map(|&r| &values[r])))
                .collect();
            Some(PairNode {
                id,
                label: slot.label,
                node_type: node_type.to_string(),
                extras,
            })
        })
        .collect();

    let mut grouped: BTreeMap<(String, String, String), u64> = BTreeMap::new();
    for row in 0..table.len() {
        let (Some(source), Some(target)) = (&source_ids[row], &target_ids[row]) else {
            continue;
        };
        let edge_type = if labels[row].is_empty() {
            DEFAULT_EDGE_LABEL.to_string()
        } else {
            labels[row].clone()
        };
        *grouped
            .entry((source.clone(), target.clone(), edge_type))
            .or_insert(0) += 1;
    }
    let edges: Vec<PairEdge> = grouped
        .into_iter()
        .map(|((source, target, edge_type), weight)| PairEdge {
            source,
            target,
            edge_type,
            weight,
        })
        .collect();

    info!(
        "Built custom pair graph from '{}' -> '{}': {} nodes, {} edges",
        src_col,
        dst_col,
        nodes.len(),
        edges.len()
    );
    Ok(PairGraph {
        nodes,
        edges,
        extra_attrs: mapping.extra_attrs.clone(),
    })
}

/// Row indices, in row order, where each node id appears as source or target.
fn rows_by_node<'a>(
    source_ids: &'a [Option<String>],
    target_ids: &'a [Option<String>],
) -> HashMap<&'a str, Vec<usize>> {
    let mut rows: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, (source, target)) in source_ids.iter().zip(target_ids).enumerate() {
        if let Some(source) = source {
            rows.entry(source.as_str()).or_default().push(row);
        }
        if let Some(target) = target.as_deref().filter(|t| source.as_deref() != Some(*t)) {
            rows.entry(target).or_default().push(row);
        }
    }
    rows
}

fn non_empty_id(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(pair_node_id(value))
    }
}
