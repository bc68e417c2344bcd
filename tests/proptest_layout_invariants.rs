//! Property-based invariant tests for the layout adapter.
//!
//! Over random forests (including dangling parent ids) and random edges:
//!
//! 1. Output node and edge ids equal the input ids.
//! 2. Top-level nodes carry equal relative and absolute positions.
//! 3. Nested nodes carry the engine's parent-relative offset, so summing
//!    offsets up the parent chain gives the engine's absolute placement.
//! 4. An edge between a node and its parent belongs to the parent.
//! 5. A failing engine leaves the snapshot untouched.

use std::collections::HashMap;

use flowgraph_layout::{
    Edge, EdgePlacement, EngineError, FixedWidthMetrics, GraphSnapshot, LayoutAdapter, LayoutConfig,
    LayoutEngine, LayoutGraph, LayoutOptions, Node, Position,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

/// Deterministic offset per node id.
fn offset_for(id: &str) -> Position {
    let seed: u32 = id.bytes().map(u32::from).sum();
    Position::new((seed % 97) as f32 * 3.0, (seed % 31) as f32 * 7.0)
}

struct HashEngine;

impl LayoutEngine for HashEngine {
    async fn layout(
        &self,
        mut graph: LayoutGraph,
        _options: &LayoutOptions,
    ) -> Result<LayoutGraph, EngineError> {
        fn place(node: &mut LayoutGraph) {
            for child in node.children.iter_mut() {
                let pos = offset_for(&child.id);
                child.x = Some(pos.x);
                child.y = Some(pos.y);
                place(child);
            }
        }
        place(&mut graph);
        Ok(graph)
    }
}

struct BrokenEngine;

impl LayoutEngine for BrokenEngine {
    async fn layout(
        &self,
        _graph: LayoutGraph,
        _options: &LayoutOptions,
    ) -> Result<LayoutGraph, EngineError> {
        Err(EngineError::Panicked("index out of bounds".to_string()))
    }
}

/// Node `i` may point at an earlier node, at a missing id, or at nothing.
fn snapshot_strategy() -> impl Strategy<Value = GraphSnapshot> {
    (1usize..14)
        .prop_flat_map(|n| {
            let parents = proptest::collection::vec((0u8..4, 0usize..n), n);
            let edges = proptest::collection::vec((0usize..n, 0usize..n), 0..(n * 2));
            (Just(n), parents, edges)
        })
        .prop_map(|(n, parents, edge_pairs)| {
            let nodes: Vec<Node> = (0..n)
                .map(|i| {
                    let node = Node::new(format!("n{i}"), format!("node {i}"));
                    let (kind, target) = parents[i];
                    match kind {
                        0 | 1 if i > 0 => node.with_parent(format!("n{}", target % i)),
                        2 => node.with_parent(format!("ghost{i}")),
                        _ => node,
                    }
                })
                .collect();
            let edges = edge_pairs
                .into_iter()
                .enumerate()
                .map(|(idx, (s, t))| Edge::new(format!("e{idx}"), format!("n{s}"), format!("n{t}")))
                .collect();
            GraphSnapshot::new(nodes, edges)
        })
}

fn adapter<E: LayoutEngine>(engine: E) -> LayoutAdapter<E, FixedWidthMetrics> {
    LayoutAdapter::new(engine, FixedWidthMetrics::default(), LayoutConfig::default())
}

/// Parent id after orphan promotion.
fn effective_parent<'a>(node: &'a Node, ids: &HashMap<&str, &Node>) -> Option<&'a str> {
    node.parent_node.as_deref().filter(|p| ids.contains_key(p))
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Identity, root invariance, containment
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn positions_respect_containment(snapshot in snapshot_strategy()) {
        let layout_adapter = adapter(HashEngine);
        let pass = layout_adapter.try_layout(&snapshot.nodes, &snapshot.edges);
        let out = pollster::block_on(pass);
        let out = out.expect("forest layout must succeed");

        let in_ids: Vec<&str> = snapshot.nodes.iter().map(|n| n.id.as_str()).collect();
        let out_ids: Vec<&str> = out.nodes.iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(in_ids, out_ids);
        let in_edges: Vec<&str> = snapshot.edges.iter().map(|e| e.id.as_str()).collect();
        let out_edges: Vec<&str> = out.edges.iter().map(|e| e.id.as_str()).collect();
        prop_assert_eq!(in_edges, out_edges);

        let by_id: HashMap<&str, &Node> = out.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        for node in &out.nodes {
            prop_assert_eq!(node.position, offset_for(&node.id));
            match effective_parent(node, &by_id) {
                None => prop_assert_eq!(node.position_absolute, Some(node.position)),
                Some(_) => prop_assert_eq!(node.position_absolute, Some(Position::ZERO)),
            }

            let mut absolute = node.position;
            let mut expected = offset_for(&node.id);
            let mut parent = effective_parent(node, &by_id);
            while let Some(parent_id) = parent {
                let parent_node = by_id[parent_id];
                absolute = absolute.offset(parent_node.position);
                expected = expected.offset(offset_for(parent_id));
                parent = effective_parent(parent_node, &by_id);
            }
            prop_assert!((absolute.x - expected.x).abs() < 1e-3);
            prop_assert!((absolute.y - expected.y).abs() < 1e-3);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Parent/child edges belong to the parent
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn parent_child_edges_live_in_parent(snapshot in snapshot_strategy()) {
        let adapter = adapter(HashEngine);
        let prepared = adapter.prepare(&snapshot.nodes, &snapshot.edges).unwrap();
        for (idx, edge) in snapshot.edges.iter().enumerate() {
            let source_parent = prepared.parent_of(&edge.source);
            let target_parent = prepared.parent_of(&edge.target);
            let placement = prepared.edge_placement(idx).unwrap();
            if target_parent == Some(edge.source.as_str()) {
                prop_assert_eq!(placement, EdgePlacement::Container(edge.source.as_str()));
            } else if source_parent == Some(edge.target.as_str()) {
                prop_assert_eq!(placement, EdgePlacement::Container(edge.target.as_str()));
            }
            if source_parent.is_none() && target_parent.is_none() && edge.source != edge.target {
                prop_assert_eq!(placement, EdgePlacement::TopLevel);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Fallback idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn failed_pass_is_a_no_op(snapshot in snapshot_strategy()) {
        let out = pollster::block_on(adapter(BrokenEngine).layout_snapshot(&snapshot));
        prop_assert_eq!(out, snapshot);
    }
}
