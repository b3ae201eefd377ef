use super::*;

use crate::theme::{Rgb, parse_hex_color};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStyle {
    pub role: NodeRole,
    pub color: String,
    pub marker: MarkerKind,
}

/// Palette entry for a split dimension, cycling when dims outnumber colors.
pub fn dimension_color(split_dim: usize, palette: &[String]) -> &str {
    if palette.is_empty() {
        return "";
    }
    palette[split_dim % palette.len()].as_str()
}

/// Diverging color for an active leaf: the low-error end for the smallest
/// error in `range`, the high-error end for the largest, interpolated on a
/// log scale through the mid color. Degenerate ranges give the mid color.
pub fn gradient_color(error: f64, range: Option<(f64, f64)>, style: &VisualizationStyle) -> String {
    let Some(t) = gradient_position(error, range) else {
        return style.gradient_mid_color.clone();
    };
    let (Some(low), Some(mid), Some(high)) = (
        parse_hex_color(&style.gradient_low_color),
        parse_hex_color(&style.gradient_mid_color),
        parse_hex_color(&style.gradient_high_color),
    ) else {
        return style.gradient_mid_color.clone();
    };
    diverging(low, mid, high, t).to_hex()
}

fn gradient_position(error: f64, range: Option<(f64, f64)>) -> Option<f64> {
    let (min, max) = range?;
    if !(min > 0.0 && max > min && max.is_finite()) {
        return None;
    }
    let (log_min, log_max) = (min.ln(), max.ln());
    let t = (error.ln() - log_min) / (log_max - log_min);
    if t.is_nan() {
        return None;
    }
    Some(t.clamp(0.0, 1.0))
}

fn diverging(low: Rgb, mid: Rgb, high: Rgb, t: f64) -> Rgb {
    if t <= 0.5 {
        low.lerp(mid, t * 2.0)
    } else {
        mid.lerp(high, (t - 0.5) * 2.0)
    }
}

pub fn node_style(
    node: &SubdomainNode,
    error_range: Option<(f64, f64)>,
    style: &VisualizationStyle,
) -> NodeStyle {
    match node.kind {
        NodeKind::Leaf { converged: true } => NodeStyle {
            role: NodeRole::Converged,
            color: style.converged_color.clone(),
            marker: MarkerKind::Star,
        },
        NodeKind::Leaf { converged: false } => {
            let color = if style.use_error_gradient {
                gradient_color(node.l2_error, error_range, style)
            } else {
                style.active_color.clone()
            };
            NodeStyle {
                role: NodeRole::Active,
                color,
                marker: MarkerKind::Circle,
            }
        }
        NodeKind::Internal { split_dim, .. } => NodeStyle {
            role: NodeRole::Internal,
            color: dimension_color(split_dim, &style.dimension_colors).to_string(),
            marker: MarkerKind::Square,
        },
    }
}

/// Edges take the parent's split-dimension color.
pub fn edge_color(parent: &SubdomainNode, style: &VisualizationStyle) -> String {
    match parent.split_dim() {
        Some(dim) => dimension_color(dim, &style.dimension_colors).to_string(),
        None => style.edge_fallback_color.clone(),
    }
}
