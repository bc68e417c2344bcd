use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{HierarchyMode, LayoutConfig};
use crate::ir::{Direction, Position};

/// Id of the synthetic container wrapping every top-level node.
pub const ROOT_ID: &str = "__root__";

/// One node of the containment forest, stored in a [`LayoutTree`] arena.
///
/// Arena slots line up with the input node slice: slot `i` wraps `nodes[i]`.
#[derive(Debug, Clone)]
pub struct HierNode {
    pub id: String,
    pub parent: Option<usize>,
    pub width: f32,
    pub height: f32,
    pub children: Vec<usize>,
    /// Indices into the input edge slice owned by this container.
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    pub nodes: Vec<HierNode>,
    pub index: HashMap<String, usize>,
    pub roots: Vec<usize>,
    pub root_edges: Vec<usize>,
}

impl LayoutTree {
    pub fn get(&self, id: &str) -> Option<&HierNode> {
        self.index.get(id).map(|idx| &self.nodes[*idx])
    }

    pub fn is_container(&self, idx: usize) -> bool {
        !self.nodes[idx].children.is_empty()
    }

    pub fn container_count(&self) -> usize {
        (0..self.nodes.len()).filter(|idx| self.is_container(*idx)).count()
    }
}

/// Container an edge was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeOwner {
    TopLevel,
    Node(usize),
}

/// Hierarchical graph exchanged with a layout engine.
///
/// In a request `x`/`y` are unset; in a response they hold the node's
/// top-left corner relative to its parent's top-left corner.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutGraph {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutGraph>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<LayoutEdge>,
}

impl LayoutGraph {
    pub fn node(id: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Option<Position> {
        Some(Position::new(self.x?, self.y?))
    }

    /// Depth-first visit of every node below (and including) `self`.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a LayoutGraph)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Engine-facing options derived from [`LayoutConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub direction: Direction,
    pub node_node_spacing: f32,
    pub layer_spacing: f32,
    pub hierarchy_mode: HierarchyMode,
    pub margin: f32,
    pub container_padding: f32,
    pub container_header: f32,
}

impl LayoutOptions {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            direction: config.direction,
            node_node_spacing: config.node_node_spacing,
            layer_spacing: config.layer_spacing,
            hierarchy_mode: config.hierarchy_mode,
            margin: config.margin,
            container_padding: config.container_padding,
            container_header: config.container_header,
        }
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedPositions {
    pub absolute: HashMap<String, Position>,
    pub relative: HashMap<String, Position>,
}
