use std::collections::HashMap;

use tracing::warn;

use crate::config::LayoutConfig;
use crate::ir::Node;
use crate::text_metrics::{FontDescriptor, TextMetrics, label_width};

use super::error::LayoutError;
use super::types::{HierNode, LayoutTree};

/// Builds the containment forest for `nodes`.
///
/// A node whose parent id is not in `nodes` is promoted to the top level.
/// Duplicate ids and parent cycles are rejected.
pub(crate) fn build_hierarchy<M: TextMetrics + ?Sized>(
    nodes: &[Node],
    metrics: &M,
    config: &LayoutConfig,
) -> Result<LayoutTree, LayoutError> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        if index.insert(node.id.clone(), idx).is_some() {
            return Err(LayoutError::DuplicateNode(node.id.clone()));
        }
    }

    let parents: Vec<Option<usize>> = nodes
        .iter()
        .map(|node| {
            let parent_id = node.parent_node.as_deref()?;
            match index.get(parent_id) {
                Some(parent) => Some(*parent),
                None => {
                    warn!(
                        node = %node.id,
                        parent = %parent_id,
                        "parent node not found; placing node at top level"
                    );
                    None
                }
            }
        })
        .collect();

    check_parent_cycles(nodes, &parents)?;

    let mut tree_nodes: Vec<HierNode> = nodes
        .iter()
        .zip(&parents)
        .map(|(node, parent)| {
            let (width, height) = node_size(node, metrics, config);
            HierNode {
                id: node.id.clone(),
                parent: *parent,
                width,
                height,
                children: Vec::new(),
                edges: Vec::new(),
            }
        })
        .collect();

    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => tree_nodes[*parent].children.push(idx),
            None => roots.push(idx),
        }
    }

    Ok(LayoutTree {
        nodes: tree_nodes,
        index,
        roots,
        root_edges: Vec::new(),
    })
}

fn check_parent_cycles(nodes: &[Node], parents: &[Option<usize>]) -> Result<(), LayoutError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unseen,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unseen; nodes.len()];
    let mut path = Vec::new();
    for start in 0..nodes.len() {
        let mut current = Some(start);
        while let Some(idx) = current {
            match marks[idx] {
                Mark::Done => break,
                Mark::OnPath => return Err(LayoutError::ParentCycle(nodes[idx].id.clone())),
                Mark::Unseen => {
                    marks[idx] = Mark::OnPath;
                    path.push(idx);
                    current = parents[idx];
                }
            }
        }
        for idx in path.drain(..) {
            marks[idx] = Mark::Done;
        }
    }
    Ok(())
}

/// Width is the larger of the padded label and the caller's fixed width
/// (or `min_node_width` when none is given).
pub(crate) fn node_size<M: TextMetrics + ?Sized>(
    node: &Node,
    metrics: &M,
    config: &LayoutConfig,
) -> (f32, f32) {
    let font = FontDescriptor {
        family: config.font_family.as_str(),
        size: config.font_size,
    };
    let label = label_width(metrics, node.label(), &font, config.fallback_char_width);
    let measured = label + config.node_padding_x * 2.0;
    let fixed_width = node.fixed_width().filter(|w| w.is_finite() && *w > 0.0);
    let width = measured.max(fixed_width.unwrap_or(config.min_node_width));
    let height = node
        .fixed_height()
        .filter(|h| h.is_finite() && *h > 0.0)
        .unwrap_or(config.default_node_height);
    (width, height)
}
