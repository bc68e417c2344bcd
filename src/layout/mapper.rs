use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::ir::{Edge, GraphSnapshot, Node, Position};

use super::error::LayoutError;
use super::types::{LayoutEdge, LayoutGraph, LayoutTree, ResolvedPositions};

/// Copies resolved positions onto fresh node/edge records.
///
/// Nested nodes get their parent-relative position and a zeroed absolute
/// placeholder; top-level nodes get their diagram position in both.
pub(crate) fn map_results(
    nodes: &[Node],
    edges: &[Edge],
    tree: &LayoutTree,
    response: &LayoutGraph,
    positions: &ResolvedPositions,
    config: &LayoutConfig,
) -> Result<GraphSnapshot, LayoutError> {
    let handles = config
        .set_handle_positions
        .then(|| config.direction.handle_sides());

    let mut laid_out_nodes = Vec::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        let nested = tree.nodes[idx].parent.is_some();
        let chosen = if nested {
            positions.relative.get(&node.id)
        } else {
            positions.absolute.get(&node.id)
        };
        let Some(position) = chosen.copied() else {
            return Err(LayoutError::MissingNode(node.id.clone()));
        };
        let mut out = node.clone();
        out.position = position;
        out.position_absolute = Some(if nested { Position::ZERO } else { position });
        if let Some((source_side, target_side)) = handles {
            out.source_position = Some(source_side);
            out.target_position = Some(target_side);
        }
        laid_out_nodes.push(out);
    }

    let mut layout_edges: HashMap<&str, &LayoutEdge> = HashMap::with_capacity(edges.len());
    response.visit(&mut |graph| {
        for edge in &graph.edges {
            layout_edges.insert(edge.id.as_str(), edge);
        }
    });

    let mut laid_out_edges = Vec::with_capacity(edges.len());
    for edge in edges {
        let Some(layout_edge) = layout_edges.get(edge.id.as_str()) else {
            return Err(LayoutError::MissingEdge(edge.id.clone()));
        };
        let mut out = edge.clone();
        out.source = layout_edge.source.clone();
        out.target = layout_edge.target.clone();
        if out.edge_type.is_none() {
            out.edge_type = config.default_edge_type.clone();
        }
        laid_out_edges.push(out);
    }

    Ok(GraphSnapshot::new(laid_out_nodes, laid_out_edges))
}
