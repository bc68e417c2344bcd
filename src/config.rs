use crate::ir::Direction;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyMode {
    /// Containers are laid out together with their parents in one pass.
    #[default]
    Joint,
    /// Each container's children are laid out on their own, bottom-up.
    Independent,
}

impl HierarchyMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "joint" | "include_children" => Some(Self::Joint),
            "independent" | "separate_children" => Some(Self::Independent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub node_node_spacing: f32,
    pub layer_spacing: f32,
    pub hierarchy_mode: HierarchyMode,
    pub default_node_height: f32,
    pub min_node_width: f32,
    pub node_padding_x: f32,
    pub container_padding: f32,
    pub container_header: f32,
    pub margin: f32,
    pub font_family: String,
    pub font_size: f32,
    pub fallback_char_width: f32,
    pub default_edge_type: Option<String>,
    pub set_handle_positions: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Right,
            node_node_spacing: 80.0,
            layer_spacing: 100.0,
            hierarchy_mode: HierarchyMode::Joint,
            default_node_height: 50.0,
            min_node_width: 150.0,
            node_padding_x: 10.0,
            container_padding: 20.0,
            container_header: 30.0,
            margin: 8.0,
            font_family: "sans-serif".to_string(),
            font_size: 16.0,
            fallback_char_width: 0.56,
            default_edge_type: Some("smoothstep".to_string()),
            set_handle_positions: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    // Accepted at the top level too, so a bare options object works.
    direction: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    direction: Option<String>,
    node_node_spacing: Option<f32>,
    layer_spacing: Option<f32>,
    hierarchy_mode: Option<String>,
    default_node_height: Option<f32>,
    min_node_width: Option<f32>,
    node_padding_x: Option<f32>,
    container_padding: Option<f32>,
    container_header: Option<f32>,
    margin: Option<f32>,
    font_family: Option<String>,
    font_size: Option<f32>,
    fallback_char_width: Option<f32>,
    default_edge_type: Option<String>,
    set_handle_positions: Option<bool>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(token) = parsed.direction.as_deref() {
        config.layout.direction = parse_direction(token)?;
    }

    let Some(file) = parsed.layout else {
        return Ok(config);
    };
    let layout = &mut config.layout;
    if let Some(token) = file.direction.as_deref() {
        layout.direction = parse_direction(token)?;
    }
    if let Some(token) = file.hierarchy_mode.as_deref() {
        layout.hierarchy_mode = HierarchyMode::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown hierarchy mode `{token}`"))?;
    }
    if let Some(v) = file.node_node_spacing {
        layout.node_node_spacing = v;
    }
    if let Some(v) = file.layer_spacing {
        layout.layer_spacing = v;
    }
    if let Some(v) = file.default_node_height {
        layout.default_node_height = v;
    }
    if let Some(v) = file.min_node_width {
        layout.min_node_width = v;
    }
    if let Some(v) = file.node_padding_x {
        layout.node_padding_x = v;
    }
    if let Some(v) = file.container_padding {
        layout.container_padding = v;
    }
    if let Some(v) = file.container_header {
        layout.container_header = v;
    }
    if let Some(v) = file.margin {
        layout.margin = v;
    }
    if let Some(v) = file.font_family {
        layout.font_family = v;
    }
    if let Some(v) = file.font_size {
        layout.font_size = v;
    }
    if let Some(v) = file.fallback_char_width {
        layout.fallback_char_width = v;
    }
    if let Some(v) = file.default_edge_type {
        layout.default_edge_type = if v.trim().is_empty() { None } else { Some(v) };
    }
    if let Some(v) = file.set_handle_positions {
        layout.set_handle_positions = v;
    }
    Ok(config)
}

fn parse_direction(token: &str) -> anyhow::Result<Direction> {
    Direction::from_token(token).ok_or_else(|| anyhow::anyhow!("unknown direction `{token}`"))
}
