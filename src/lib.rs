//! Automatic layout for diagrams made of nested nodes and edges.
//!
//! Callers hand over a flat node list (children point at their parent by
//! id) plus edges. [`LayoutAdapter`] turns that into a containment tree,
//! attaches each edge to the deepest container holding both endpoints,
//! runs a [`LayoutEngine`] and maps the result back: nested nodes get
//! parent-relative positions, top-level nodes diagram positions.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, HierarchyMode, LayoutConfig, load_config};
pub use ir::{Direction, Edge, GraphSnapshot, HandleSide, Node, Position};
pub use layout::{
    DagreEngine, EdgePlacement, EngineError, LayoutAdapter, LayoutEngine, LayoutError, LayoutGraph,
    LayoutOptions, PreparedLayout,
};
pub use text_metrics::{FixedWidthMetrics, FontDescriptor, SystemFontMetrics, TextMetrics};
