mod coords;
mod dagre;
mod edges;
mod engine;
mod error;
mod hierarchy;
mod mapper;
pub(crate) mod types;

pub use dagre::DagreEngine;
pub use engine::LayoutEngine;
pub use error::{EngineError, LayoutError};
pub use types::{LayoutEdge, LayoutGraph, LayoutOptions, ROOT_ID};

use tracing::{debug, error, instrument};

use crate::config::LayoutConfig;
use crate::ir::{Edge, GraphSnapshot, Node};
use crate::text_metrics::{SystemFontMetrics, TextMetrics};
use types::{EdgeOwner, LayoutTree};

/// Where an edge ended up in the containment forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePlacement<'a> {
    TopLevel,
    Container(&'a str),
}

/// Hierarchy, edge owners and engine request for one layout pass.
#[derive(Debug, Clone)]
pub struct PreparedLayout {
    tree: LayoutTree,
    owners: Vec<EdgeOwner>,
    request: LayoutGraph,
}

impl PreparedLayout {
    pub fn request(&self) -> &LayoutGraph {
        &self.request
    }

    /// Container owning the edge at `edge_index` in the input slice.
    pub fn edge_placement(&self, edge_index: usize) -> Option<EdgePlacement<'_>> {
        Some(match self.owners.get(edge_index)? {
            EdgeOwner::TopLevel => EdgePlacement::TopLevel,
            EdgeOwner::Node(idx) => EdgePlacement::Container(self.tree.nodes[*idx].id.as_str()),
        })
    }

    /// Parent a node was nested under, `None` at top level (including
    /// nodes whose declared parent does not exist).
    pub fn parent_of(&self, node_id: &str) -> Option<&str> {
        let parent = self.tree.get(node_id)?.parent?;
        Some(self.tree.nodes[parent].id.as_str())
    }

    /// Size the node was given before layout.
    pub fn node_size(&self, node_id: &str) -> Option<(f32, f32)> {
        self.tree.get(node_id).map(|node| (node.width, node.height))
    }
}

/// Lays out flat parent-pointer graphs through an injected [`LayoutEngine`].
///
/// A pass never mutates the caller's records. [`LayoutAdapter::layout`] is
/// the infallible entry point: on any failure it logs and hands back the
/// input unchanged.
pub struct LayoutAdapter<E, M = SystemFontMetrics> {
    engine: E,
    metrics: M,
    config: LayoutConfig,
}

impl<E: LayoutEngine> LayoutAdapter<E, SystemFontMetrics> {
    pub fn with_system_fonts(engine: E, config: LayoutConfig) -> Self {
        Self::new(engine, SystemFontMetrics::new(), config)
    }
}

impl<E: LayoutEngine, M: TextMetrics> LayoutAdapter<E, M> {
    pub fn new(engine: E, metrics: M, config: LayoutConfig) -> Self {
        Self {
            engine,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LayoutConfig {
        &mut self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Builds the containment forest, assigns edges and serializes the
    /// request. Structural input errors surface here.
    pub fn prepare(&self, nodes: &[Node], edges: &[Edge]) -> Result<PreparedLayout, LayoutError> {
        let mut tree = hierarchy::build_hierarchy(nodes, &self.metrics, &self.config)?;
        let owners = edges::assign_edges(&mut tree, edges)?;
        debug!(
            roots = tree.roots.len(),
            containers = tree.container_count(),
            top_level_edges = tree.root_edges.len(),
            "prepared layout request"
        );
        let request = engine::build_request(&tree, edges);
        Ok(PreparedLayout {
            tree,
            owners,
            request,
        })
    }

    /// Runs one pass, reporting every failure to the caller.
    #[instrument(skip_all, fields(nodes = nodes.len(), edges = edges.len()))]
    pub async fn try_layout(
        &self,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Result<GraphSnapshot, LayoutError> {
        let prepared = self.prepare(nodes, edges)?;
        let options = LayoutOptions::from_config(&self.config);
        let PreparedLayout { tree, request, .. } = prepared;
        let response = self.engine.layout(request, &options).await?;
        let positions = coords::resolve_positions(&response)?;
        mapper::map_results(nodes, edges, &tree, &response, &positions, &self.config)
    }

    /// Runs one pass; on failure logs the error and returns the input as is.
    pub async fn layout(&self, nodes: &[Node], edges: &[Edge]) -> GraphSnapshot {
        match self.try_layout(nodes, edges).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    error = %err,
                    structural = err.is_structural(),
                    "layout pass failed; keeping previous positions"
                );
                GraphSnapshot::new(nodes.to_vec(), edges.to_vec())
            }
        }
    }

    pub async fn layout_snapshot(&self, snapshot: &GraphSnapshot) -> GraphSnapshot {
        self.layout(&snapshot.nodes, &snapshot.edges).await
    }
}
