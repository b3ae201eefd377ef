use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleFactors {
    pub size_scale: f32,
    pub font_scale: f32,
    pub node_size: f32,
    pub font_size: f32,
    pub edge_width: f32,
    pub horizontal_scale: f32,
    pub figure_width: f32,
    pub figure_height: f32,
}

/// Visual parameters for a tree of the given shape.
///
/// Small trees (at most `auto_scale_threshold` nodes) keep the configured
/// sizes. Past the threshold, node and font sizes shrink linearly in
/// `log2(nodes / threshold)` within their own clamp ranges, and the
/// horizontal spread grows with `log2(leaves / leaf_spread_threshold)`.
pub fn compute_scale(stats: &TreeStats, style: &VisualizationStyle) -> ScaleFactors {
    let (figure_width, figure_height) = figure_size(stats, style);
    let scaled = style.auto_scale && stats.node_count > style.auto_scale_threshold;
    if !scaled {
        return ScaleFactors {
            size_scale: 1.0,
            font_scale: 1.0,
            node_size: style.node_size,
            font_size: style.font_size,
            edge_width: style.edge_width,
            horizontal_scale: style.horizontal_scale,
            figure_width,
            figure_height,
        };
    }

    let doublings = (stats.node_count as f32 / style.auto_scale_threshold as f32).log2();
    let raw = 1.0 - style.size_scale_slope * doublings;
    let size_scale = raw.clamp(style.min_size_scale, style.max_size_scale);
    let font_scale = raw.clamp(style.min_font_scale, style.max_font_scale);

    let mut horizontal_scale = style.horizontal_scale;
    if stats.leaf_count > style.leaf_spread_threshold {
        let spread = (stats.leaf_count as f32 / style.leaf_spread_threshold as f32).log2();
        horizontal_scale *= 1.0 + spread;
    }

    let factors = ScaleFactors {
        size_scale,
        font_scale,
        node_size: (style.node_size * size_scale).clamp(style.min_node_size, style.max_node_size),
        font_size: (style.font_size * font_scale).clamp(style.min_font_size, style.max_font_size),
        edge_width: (style.edge_width * size_scale).max(style.min_edge_width),
        horizontal_scale,
        figure_width,
        figure_height,
    };
    tracing::trace!(
        nodes = stats.node_count,
        leaves = stats.leaf_count,
        size_scale,
        font_scale,
        horizontal_scale,
        "auto-scaled tree visuals"
    );
    factors
}

fn figure_size(stats: &TreeStats, style: &VisualizationStyle) -> (f32, f32) {
    let width = (stats.leaf_count as f32 * style.figure_width_per_leaf + style.figure_width_offset)
        .clamp(style.min_figure_width, style.max_figure_width);
    let height = (stats.max_depth as f32 * style.figure_height_per_level
        + style.figure_height_offset)
        .clamp(style.min_figure_height, style.max_figure_height);
    (width, height)
}
