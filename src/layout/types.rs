use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::{NodeId, TreeStats};

use super::scale::ScaleFactors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Circle,
    Square,
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Converged,
    Active,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeLayout {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    /// Horizontal extent assigned to this node, after scaling.
    pub interval: (f32, f32),
    pub depth: usize,
    pub role: NodeRole,
    pub color: String,
    pub marker: MarkerKind,
    pub size: f32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeLayout {
    pub from: NodeId,
    pub to: NodeId,
    pub color: String,
    pub width: f32,
    pub points: [(f32, f32); 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: String,
    pub marker: MarkerKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradientLegend {
    pub low_color: String,
    pub mid_color: String,
    pub high_color: String,
    pub min_error: f64,
    pub max_error: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
    pub gradient: Option<GradientLegend>,
}

impl Legend {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.gradient.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Everything the renderer needs, as plain data.
#[derive(Debug, Clone, Serialize)]
pub struct TreeLayout {
    pub nodes: BTreeMap<NodeId, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub legend: Legend,
    pub scale: ScaleFactors,
    pub stats: TreeStats,
    pub bounds: Bounds,
    pub title: String,
}
