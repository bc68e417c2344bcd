use std::any::Any;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::config::HierarchyMode;
use crate::ir::Direction;

use super::engine::LayoutEngine;
use super::error::EngineError;
use super::types::{LayoutEdge, LayoutGraph, LayoutOptions};

type Dagre = DagreGraph<DagreConfig, DagreNode, DagreEdge>;

const ENTRY_ANCHOR: &str = "__entry__";
const EXIT_ANCHOR: &str = "__exit__";
const ANCHOR_SIZE: f32 = 1.0;

/// [`LayoutEngine`] backed by the dagre layered layout.
///
/// Containers are laid out innermost first as flat dagre graphs and sized
/// around their children, then ranked as ordinary nodes one level up. An
/// edge that ends on a container or inside it is ranked against the direct
/// child of the current level that holds that endpoint.
///
/// In joint mode every edge of the forest takes part at every level, and an
/// edge crossing a container boundary pulls its inner endpoint towards the
/// entry (incoming) or exit (outgoing) side of that container. In
/// independent mode a container only sees the edges it owns.
#[derive(Debug, Clone, Copy, Default)]
pub struct DagreEngine;

impl DagreEngine {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutEngine for DagreEngine {
    async fn layout(
        &self,
        mut graph: LayoutGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutGraph, EngineError> {
        check_edge_endpoints(&graph)?;
        let forest_edges = match options.hierarchy_mode {
            HierarchyMode::Joint => Some(endpoint_pairs(&graph)),
            HierarchyMode::Independent => None,
        };
        let outcome = catch_quiet(|| {
            layout_level(&mut graph, options, forest_edges.as_deref(), true)
        });
        match outcome {
            Ok(Ok(())) => Ok(graph),
            Ok(Err(err)) => Err(err),
            Err(payload) => Err(EngineError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

thread_local! {
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Runs `f`, catching a panic without printing it through the default hook.
/// Panics on other threads, or outside `f`, still reach the previous hook.
fn catch_quiet<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    PANIC_HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if QUIET_PANICS.with(Cell::get) {
                debug!(location = ?info.location(), "dagre panicked");
            } else {
                previous(info);
            }
        }));
    });
    let was_quiet = QUIET_PANICS.with(|quiet| quiet.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    QUIET_PANICS.with(|quiet| quiet.set(was_quiet));
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn collect_edges(graph: &LayoutGraph) -> Vec<&LayoutEdge> {
    let mut edges = Vec::new();
    graph.visit(&mut |node| edges.extend(node.edges.iter()));
    edges
}

/// Source/target of every edge in the forest, self-loops left out.
fn endpoint_pairs(graph: &LayoutGraph) -> Vec<(String, String)> {
    collect_edges(graph)
        .into_iter()
        .filter(|edge| edge.source != edge.target)
        .map(|edge| (edge.source.clone(), edge.target.clone()))
        .collect()
}

fn check_edge_endpoints(graph: &LayoutGraph) -> Result<(), EngineError> {
    let mut ids: HashSet<&str> = HashSet::new();
    for child in &graph.children {
        child.visit(&mut |node| {
            ids.insert(node.id.as_str());
        });
    }
    for edge in collect_edges(graph) {
        for end in [&edge.source, &edge.target] {
            if !ids.contains(end.as_str()) {
                return Err(EngineError::UnknownNode {
                    edge: edge.id.clone(),
                    node: end.clone(),
                });
            }
        }
    }
    Ok(())
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::Down => "tb",
        Direction::Up => "bt",
        Direction::Right => "lr",
        Direction::Left => "rl",
    }
}

fn new_dagre_graph(options: &LayoutOptions) -> Dagre {
    let mut dagre_graph: Dagre = DagreGraph::new(Some(GraphOption {
        directed: Some(true),
        multigraph: Some(false),
        compound: Some(false),
    }));
    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(options.direction).to_string());
    graph_config.nodesep = Some(options.node_node_spacing);
    graph_config.ranksep = Some(options.layer_spacing);
    graph_config.marginx = Some(options.margin);
    graph_config.marginy = Some(options.margin);
    dagre_graph.set_graph(graph_config);
    dagre_graph
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Rect {
    fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Option<Self> {
        let rect = Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        };
        let finite = [rect.x, rect.y, rect.width, rect.height]
            .iter()
            .all(|v| v.is_finite());
        finite.then_some(rect)
    }

    fn union(self, other: Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

fn bounds<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
    rects.into_iter().copied().reduce(Rect::union)
}

/// Flat dagre input for one container: its direct children, then any
/// boundary anchors.
#[derive(Debug, Default)]
struct LevelGraph {
    ids: Vec<String>,
    sizes: Vec<(f32, f32)>,
    pairs: Vec<(usize, usize)>,
    seen: HashSet<(usize, usize)>,
    entry: Option<usize>,
    exit: Option<usize>,
}

impl LevelGraph {
    fn link(&mut self, source: usize, target: usize) {
        if source != target && self.seen.insert((source, target)) {
            self.pairs.push((source, target));
        }
    }

    fn anchor(&mut self, base: &str) -> usize {
        let mut id = base.to_string();
        while self.ids.contains(&id) {
            id.push('_');
        }
        self.ids.push(id);
        self.sizes.push((ANCHOR_SIZE, ANCHOR_SIZE));
        self.ids.len() - 1
    }

    fn entry(&mut self) -> usize {
        match self.entry {
            Some(idx) => idx,
            None => {
                let idx = self.anchor(ENTRY_ANCHOR);
                self.entry = Some(idx);
                idx
            }
        }
    }

    fn exit(&mut self) -> usize {
        match self.exit {
            Some(idx) => idx,
            None => {
                let idx = self.anchor(EXIT_ANCHOR);
                self.exit = Some(idx);
                idx
            }
        }
    }
}

/// Lifts edges onto `node`'s direct children. `forest_edges` is set in joint
/// mode; otherwise only the edges `node` owns are ranked.
fn level_graph(node: &LayoutGraph, forest_edges: Option<&[(String, String)]>) -> LevelGraph {
    let mut level = LevelGraph::default();
    let mut holder: HashMap<&str, usize> = HashMap::new();
    for (idx, child) in node.children.iter().enumerate() {
        child.visit(&mut |descendant| {
            holder.insert(descendant.id.as_str(), idx);
        });
        level.ids.push(child.id.clone());
        level.sizes.push((child.width, child.height));
    }
    let lift = |id: &str| holder.get(id).copied();

    match forest_edges {
        None => {
            for edge in &node.edges {
                match (lift(&edge.source), lift(&edge.target)) {
                    (Some(source), Some(target)) => level.link(source, target),
                    _ => {
                        trace!(
                            edge = %edge.id,
                            container = %node.id,
                            "edge ends on its own container"
                        );
                    }
                }
            }
        }
        Some(edges) => {
            for (source, target) in edges {
                match (lift(source), lift(target)) {
                    (Some(source), Some(target)) => level.link(source, target),
                    (None, Some(target)) => {
                        let entry = level.entry();
                        level.link(entry, target);
                    }
                    (Some(source), None) => {
                        let exit = level.exit();
                        level.link(source, exit);
                    }
                    (None, None) => {}
                }
            }
        }
    }
    level
}

/// Lays out `node`'s children, innermost containers first, and sizes `node`
/// around them.
fn layout_level(
    node: &mut LayoutGraph,
    options: &LayoutOptions,
    forest_edges: Option<&[(String, String)]>,
    is_root: bool,
) -> Result<(), EngineError> {
    for child in node.children.iter_mut() {
        if !child.children.is_empty() {
            layout_level(child, options, forest_edges, false)?;
        }
    }
    if node.children.is_empty() {
        return Ok(());
    }

    let level = level_graph(node, forest_edges);
    let rects = run_flat_dagre(&level, options)?;
    let placed = &rects[..node.children.len()];
    let Some(all) = bounds(placed) else {
        return Ok(());
    };

    let (pad_x, pad_top, pad_bottom) = if is_root {
        (options.margin, options.margin, options.margin)
    } else {
        let pad = options.container_padding;
        (pad, pad + options.container_header, pad)
    };
    for (child, rect) in node.children.iter_mut().zip(placed) {
        child.x = Some(rect.x - all.x + pad_x);
        child.y = Some(rect.y - all.y + pad_top);
    }
    let width = all.width + pad_x * 2.0;
    let height = all.height + pad_top + pad_bottom;
    if is_root {
        node.width = width;
        node.height = height;
    } else {
        node.width = node.width.max(width);
        node.height = node.height.max(height);
    }
    Ok(())
}

fn run_flat_dagre(level: &LevelGraph, options: &LayoutOptions) -> Result<Vec<Rect>, EngineError> {
    let mut dagre_graph = new_dagre_graph(options);
    for (id, (width, height)) in level.ids.iter().zip(&level.sizes) {
        let mut node = DagreNode::default();
        node.width = *width;
        node.height = *height;
        dagre_graph.set_node(id.clone(), Some(node));
    }
    for (source, target) in &level.pairs {
        let edge_label = DagreEdge::default();
        let _ = dagre_graph.set_edge(
            &level.ids[*source],
            &level.ids[*target],
            Some(edge_label),
            None,
        );
    }

    dagre_layout::run_layout(&mut dagre_graph);

    level
        .ids
        .iter()
        .zip(&level.sizes)
        .map(|(id, (width, height))| {
            dagre_graph
                .node(id)
                .and_then(|placed| Rect::centered(placed.x, placed.y, *width, *height))
                .ok_or_else(|| {
                    EngineError::Failed(format!("dagre returned no position for `{id}`"))
                })
        })
        .collect()
}
