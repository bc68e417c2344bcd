use crate::ir::Edge;

use super::error::EngineError;
use super::types::{LayoutEdge, LayoutGraph, LayoutOptions, LayoutTree, ROOT_ID};

/// An automatic graph layout algorithm.
///
/// Receives the containment forest wrapped in a synthetic root and returns
/// the same tree with `x`, `y`, `width` and `height` filled in for every
/// node, positions relative to the parent's top-left corner.
#[allow(async_fn_in_trait)]
pub trait LayoutEngine {
    async fn layout(
        &self,
        graph: LayoutGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutGraph, EngineError>;
}

impl<T: LayoutEngine + ?Sized> LayoutEngine for &T {
    async fn layout(
        &self,
        graph: LayoutGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutGraph, EngineError> {
        (**self).layout(graph, options).await
    }
}

/// Converts the arena into the nested request handed to the engine.
pub(crate) fn build_request(tree: &LayoutTree, edges: &[Edge]) -> LayoutGraph {
    let mut root = LayoutGraph::node(ROOT_ID, 0.0, 0.0);
    root.children = tree
        .roots
        .iter()
        .map(|idx| request_node(tree, *idx, edges))
        .collect();
    root.edges = tree
        .root_edges
        .iter()
        .map(|idx| request_edge(&edges[*idx]))
        .collect();
    root
}

fn request_node(tree: &LayoutTree, idx: usize, edges: &[Edge]) -> LayoutGraph {
    let node = &tree.nodes[idx];
    let mut graph = LayoutGraph::node(node.id.clone(), node.width, node.height);
    graph.children = node
        .children
        .iter()
        .map(|child| request_node(tree, *child, edges))
        .collect();
    graph.edges = node
        .edges
        .iter()
        .map(|edge_idx| request_edge(&edges[*edge_idx]))
        .collect();
    graph
}

fn request_edge(edge: &Edge) -> LayoutEdge {
    LayoutEdge {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::Node;
    use crate::layout::edges::assign_edges;
    use crate::layout::hierarchy::build_hierarchy;
    use crate::text_metrics::FixedWidthMetrics;

    #[test]
    fn request_mirrors_containment_and_edge_owners() {
        let nodes = vec![
            Node::new("A", "A"),
            Node::new("B", "B"),
            Node::new("C", "C").with_parent("B"),
        ];
        let edges = vec![
            Edge::new("ab", "A", "B"),
            Edge::new("bc", "B", "C"),
            Edge::new("ac", "A", "C"),
        ];
        let metrics = FixedWidthMetrics::default();
        let mut tree = build_hierarchy(&nodes, &metrics, &LayoutConfig::default()).unwrap();
        assign_edges(&mut tree, &edges).unwrap();

        let request = build_request(&tree, &edges);
        assert_eq!(request.id, ROOT_ID);
        assert_eq!(request.children.len(), 2);
        let edge_ids: Vec<&str> = request.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edge_ids, vec!["ab", "ac"]);

        let b = &request.children[1];
        assert_eq!(b.id, "B");
        assert_eq!(b.children[0].id, "C");
        assert_eq!(b.edges[0].id, "bc");
        assert!(b.x.is_none() && b.y.is_none());

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"children\""));
        assert!(!json.contains("\"x\""));
    }
}
