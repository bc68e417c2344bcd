use crate::config::{HierarchyMode, LayoutConfig, load_config};
use crate::ir::{Direction, GraphSnapshot};
use crate::layout::{DagreEngine, LayoutAdapter};
use crate::text_metrics::{FixedWidthMetrics, SystemFontMetrics, TextMetrics};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "flowgraph-layout",
    version,
    about = "Lay out a nested node/edge graph (JSON) with dagre"
)]
pub struct Args {
    /// Input graph JSON ({"nodes": [...], "edges": [...]}) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Flow direction
    #[arg(short = 'd', long = "direction", value_enum)]
    pub direction: Option<DirectionArg>,

    /// Lay out nested containers jointly with their parents or on their own
    #[arg(long = "hierarchy", value_enum)]
    pub hierarchy: Option<HierarchyArg>,

    /// Spacing between nodes of the same layer
    #[arg(long = "node-spacing")]
    pub node_spacing: Option<f32>,

    /// Spacing between layers
    #[arg(long = "layer-spacing")]
    pub layer_spacing: Option<f32>,

    /// Size labels with the per-character heuristic instead of system fonts
    #[arg(long = "fallback-metrics")]
    pub fallback_metrics: bool,

    /// Fail instead of returning the input unchanged when layout fails
    #[arg(long = "strict")]
    pub strict: bool,

    /// Print the layout request sent to the engine and exit
    #[arg(long = "dump-request")]
    pub dump_request: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DirectionArg {
    Right,
    Left,
    Down,
    Up,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Right => Direction::Right,
            DirectionArg::Left => Direction::Left,
            DirectionArg::Down => Direction::Down,
            DirectionArg::Up => Direction::Up,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum HierarchyArg {
    Joint,
    Independent,
}

impl From<HierarchyArg> for HierarchyMode {
    fn from(value: HierarchyArg) -> Self {
        match value {
            HierarchyArg::Joint => HierarchyMode::Joint,
            HierarchyArg::Independent => HierarchyMode::Independent,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())
        .with_context(|| "failed to load layout config")?
        .layout;
    apply_overrides(&mut config, &args);

    let input = read_input(args.input.as_deref())?;
    let snapshot = GraphSnapshot::from_json(&input).context("input is not a valid graph snapshot")?;

    let output = if args.fallback_metrics {
        let metrics = FixedWidthMetrics {
            factor: config.fallback_char_width,
        };
        lay_out(&args, config, metrics, &snapshot)?
    } else {
        lay_out(&args, config, SystemFontMetrics::new(), &snapshot)?
    };
    write_output(&output, args.output.as_deref())
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn apply_overrides(config: &mut LayoutConfig, args: &Args) {
    if let Some(direction) = args.direction {
        config.direction = direction.into();
    }
    if let Some(mode) = args.hierarchy {
        config.hierarchy_mode = mode.into();
    }
    if let Some(spacing) = args.node_spacing {
        config.node_node_spacing = spacing;
    }
    if let Some(spacing) = args.layer_spacing {
        config.layer_spacing = spacing;
    }
}

fn lay_out<M: TextMetrics>(
    args: &Args,
    config: LayoutConfig,
    metrics: M,
    snapshot: &GraphSnapshot,
) -> Result<String> {
    let adapter = LayoutAdapter::new(DagreEngine::new(), metrics, config);
    if args.dump_request {
        let prepared = adapter.prepare(&snapshot.nodes, &snapshot.edges)?;
        return Ok(serde_json::to_string_pretty(prepared.request())?);
    }
    let laid_out = if args.strict {
        pollster::block_on(adapter.try_layout(&snapshot.nodes, &snapshot.edges))?
    } else {
        pollster::block_on(adapter.layout_snapshot(snapshot))
    };
    Ok(laid_out.to_json_pretty()?)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(json: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_verbose_flag_enables_debug() {
        let args = Args::parse_from(["flowgraph-layout", "-v"]);
        assert_eq!(log_level(args.verbose), "debug");
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(2), "trace");
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "flowgraph-layout",
            "-d",
            "down",
            "--hierarchy",
            "independent",
            "--node-spacing",
            "12",
        ]);
        let mut config = LayoutConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.direction, Direction::Down);
        assert_eq!(config.hierarchy_mode, HierarchyMode::Independent);
        assert_eq!(config.node_node_spacing, 12.0);
        assert_eq!(config.layer_spacing, 100.0);
    }

    #[test]
    fn dump_request_serializes_tree() {
        let args = Args::parse_from(["flowgraph-layout", "--dump-request"]);
        let snapshot = GraphSnapshot::from_json(
            r#"{"nodes":[{"id":"p","data":{"label":"P"}},
                          {"id":"c","parentNode":"p","data":{"label":"C"}}],
                "edges":[{"id":"e","source":"p","target":"c"}]}"#,
        )
        .unwrap();
        let json = lay_out(
            &args,
            LayoutConfig::default(),
            FixedWidthMetrics::default(),
            &snapshot,
        )
        .unwrap();
        let request: crate::layout::LayoutGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(request.children[0].id, "p");
        assert_eq!(request.children[0].children[0].id, "c");
        assert_eq!(request.children[0].edges[0].id, "e");
    }
}
