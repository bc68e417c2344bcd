use std::collections::HashSet;

use tracing::debug;

use crate::ir::Edge;

use super::error::LayoutError;
use super::types::{EdgeOwner, LayoutTree};

/// Attaches every edge to the container owning its endpoints' lowest common
/// ancestor and returns the owner of each edge, in input order.
pub(crate) fn assign_edges(
    tree: &mut LayoutTree,
    edges: &[Edge],
) -> Result<Vec<EdgeOwner>, LayoutError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(edges.len());
    let mut owners = Vec::with_capacity(edges.len());
    for (edge_idx, edge) in edges.iter().enumerate() {
        if !seen.insert(edge.id.as_str()) {
            return Err(LayoutError::DuplicateEdge(edge.id.clone()));
        }
        let source = endpoint(tree, edge, &edge.source)?;
        let target = endpoint(tree, edge, &edge.target)?;
        let owner = match lowest_common_ancestor(tree, source, target) {
            Some(container) => {
                tree.nodes[container].edges.push(edge_idx);
                EdgeOwner::Node(container)
            }
            None => {
                if tree.nodes[source].parent.is_some() || tree.nodes[target].parent.is_some() {
                    debug!(edge = %edge.id, "endpoints share no ancestor; edge stays at top level");
                }
                tree.root_edges.push(edge_idx);
                EdgeOwner::TopLevel
            }
        };
        owners.push(owner);
    }
    Ok(owners)
}

fn endpoint(tree: &LayoutTree, edge: &Edge, id: &str) -> Result<usize, LayoutError> {
    tree.index
        .get(id)
        .copied()
        .ok_or_else(|| LayoutError::UnknownEdgeEndpoint {
            edge: edge.id.clone(),
            node: id.to_string(),
        })
}

/// Ancestors of `idx`, nearest first. The node itself is excluded.
pub(crate) fn ancestor_chain(tree: &LayoutTree, idx: usize) -> Vec<usize> {
    let mut chain = Vec::new();
    let mut current = tree.nodes[idx].parent;
    while let Some(parent) = current {
        chain.push(parent);
        current = tree.nodes[parent].parent;
    }
    chain
}

/// Deepest container holding both endpoints, or `None` for the top level.
///
/// When one endpoint is an ancestor of the other, that endpoint owns the
/// edge. A self-loop belongs to the node's parent.
pub(crate) fn lowest_common_ancestor(
    tree: &LayoutTree,
    source: usize,
    target: usize,
) -> Option<usize> {
    let source_chain = ancestor_chain(tree, source);
    let target_chain = ancestor_chain(tree, target);
    if source != target {
        if target_chain.contains(&source) {
            return Some(source);
        }
        if source_chain.contains(&target) {
            return Some(target);
        }
    }
    let target_set: HashSet<usize> = target_chain.into_iter().collect();
    source_chain.into_iter().find(|idx| target_set.contains(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::Node;
    use crate::layout::hierarchy::build_hierarchy;
    use crate::text_metrics::FixedWidthMetrics;

    fn tree(nodes: &[Node]) -> LayoutTree {
        build_hierarchy(nodes, &FixedWidthMetrics::default(), &LayoutConfig::default()).unwrap()
    }

    fn nested() -> Vec<Node> {
        vec![
            Node::new("A", "A"),
            Node::new("B", "B"),
            Node::new("C", "C").with_parent("B"),
            Node::new("D", "D").with_parent("B"),
            Node::new("E", "E").with_parent("D"),
            Node::new("F", "F").with_parent("D"),
        ]
    }

    #[test]
    fn ancestor_chain_is_nearest_first() {
        let tree = tree(&nested());
        assert_eq!(ancestor_chain(&tree, 4), vec![3, 1]);
        assert!(ancestor_chain(&tree, 0).is_empty());
    }

    #[test]
    fn assigns_edges_to_lowest_common_ancestor() {
        let mut tree = tree(&nested());
        let edges = vec![
            Edge::new("ab", "A", "B"),
            Edge::new("bc", "B", "C"),
            Edge::new("ac", "A", "C"),
            Edge::new("ef", "E", "F"),
            Edge::new("ce", "C", "E"),
            Edge::new("eb", "E", "B"),
            Edge::new("ee", "E", "E"),
        ];
        let owners = assign_edges(&mut tree, &edges).unwrap();
        assert_eq!(
            owners,
            vec![
                EdgeOwner::TopLevel,
                EdgeOwner::Node(1),
                EdgeOwner::TopLevel,
                EdgeOwner::Node(3),
                EdgeOwner::Node(1),
                EdgeOwner::Node(1),
                EdgeOwner::Node(3),
            ]
        );
        assert_eq!(tree.root_edges, vec![0, 2]);
        assert_eq!(tree.nodes[1].edges, vec![1, 4, 5]);
        assert_eq!(tree.nodes[3].edges, vec![3, 6]);
    }

    #[test]
    fn unknown_endpoint_is_structural_error() {
        let mut tree = tree(&nested());
        let err = assign_edges(&mut tree, &[Edge::new("x", "A", "nope")]).unwrap_err();
        assert!(err.is_structural());
        assert_eq!(
            err,
            LayoutError::UnknownEdgeEndpoint {
                edge: "x".to_string(),
                node: "nope".to_string()
            }
        );
    }

    #[test]
    fn duplicate_edge_ids_are_rejected() {
        let mut tree = tree(&nested());
        let edges = vec![Edge::new("e", "A", "B"), Edge::new("e", "B", "C")];
        assert_eq!(
            assign_edges(&mut tree, &edges).unwrap_err(),
            LayoutError::DuplicateEdge("e".to_string())
        );
    }
}
