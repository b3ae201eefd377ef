pub mod labels;
pub mod legend;
pub mod positions;
pub mod scale;
pub mod styling;
pub(crate) mod types;
pub use types::*;
use labels::node_label;
use legend::build_legend;
use positions::compute_positions;
use scale::compute_scale;
use styling::{edge_color, node_style};

pub use positions::NodePosition;
pub use scale::ScaleFactors;

use crate::config::VisualizationStyle;
use crate::ir::{NodeId, NodeKind, SubdivisionTree, SubdomainNode, TreeStats};
use serde::Serialize;
use std::collections::BTreeMap;

/// Lays out and styles a subdivision tree for rendering.
///
/// Pure: the tree and style are only read, and the same inputs always give
/// the same layout.
pub fn compute_layout(tree: &SubdivisionTree, style: &VisualizationStyle) -> TreeLayout {
    let stats = tree.stats();
    let scale = compute_scale(&stats, style);
    let positions = compute_positions(tree, style, scale.horizontal_scale);
    let error_range = tree.active_error_range();

    let mut nodes: BTreeMap<NodeId, NodeLayout> = BTreeMap::new();
    let mut edges = Vec::with_capacity(tree.len().saturating_sub(1));
    for node in tree.preorder() {
        let Some(pos) = positions.get(&node.id) else {
            continue;
        };
        let styled = node_style(node, error_range, style);
        nodes.insert(
            node.id,
            NodeLayout {
                id: node.id,
                x: pos.x,
                y: pos.y,
                interval: pos.interval,
                depth: node.depth,
                role: styled.role,
                color: styled.color,
                marker: styled.marker,
                size: scale.node_size,
                label: node_label(tree, node, style),
            },
        );

        if let Some((left, right)) = node.children() {
            let color = edge_color(node, style);
            for child in [left, right] {
                let Some(child_pos) = positions.get(&child) else {
                    continue;
                };
                edges.push(EdgeLayout {
                    from: node.id,
                    to: child,
                    color: color.clone(),
                    width: scale.edge_width,
                    points: [(pos.x, pos.y), (child_pos.x, child_pos.y)],
                });
            }
        }
    }

    let bounds = bounds_from_nodes(&nodes);
    let layout = TreeLayout {
        nodes,
        edges,
        legend: build_legend(tree, style),
        scale,
        stats,
        bounds,
        title: summary_title(&stats),
    };
    tracing::debug!(
        nodes = layout.nodes.len(),
        edges = layout.edges.len(),
        size_scale = layout.scale.size_scale,
        width = layout.scale.figure_width,
        height = layout.scale.figure_height,
        "computed subdivision tree layout"
    );
    layout
}

fn bounds_from_nodes(nodes: &BTreeMap<NodeId, NodeLayout>) -> Bounds {
    let mut bounds: Option<Bounds> = None;
    for node in nodes.values() {
        let b = bounds.get_or_insert(Bounds {
            min_x: node.x,
            max_x: node.x,
            min_y: node.y,
            max_y: node.y,
        });
        b.min_x = b.min_x.min(node.x);
        b.max_x = b.max_x.max(node.x);
        b.min_y = b.min_y.min(node.y);
        b.max_y = b.max_y.max(node.y);
    }
    bounds.unwrap_or(Bounds {
        min_x: 0.0,
        max_x: 0.0,
        min_y: 0.0,
        max_y: 0.0,
    })
}

fn summary_title(stats: &TreeStats) -> String {
    format!(
        "{} nodes · {} leaves · {} converged · depth {}",
        stats.node_count, stats.leaf_count, stats.converged_count, stats.max_depth
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleConfig;
    use crate::ir::test_support::*;
    use approx::assert_relative_eq;

    #[test]
    fn three_node_scenario() {
        let style = VisualizationStyle::new(StyleConfig {
            horizontal_scale: 2.0,
            vertical_spacing: 1.5,
            ..StyleConfig::default()
        })
        .unwrap();
        let root_error = 0.5;
        let layout = compute_layout(&three_node_tree(root_error), &style);
        let (h, v) = (2.0f32, 1.5f32);

        let root = &layout.nodes[&1];
        assert_relative_eq!(root.x, 5.0 * h);
        assert_relative_eq!(root.y, 0.0);
        assert_eq!(root.marker, MarkerKind::Square);
        let pct = (root_error - (1e-6 + 0.01)) / root_error * 100.0;
        assert_eq!(root.label, format!("x1 ↓{pct:.1}%"));

        let left = &layout.nodes[&2];
        assert_relative_eq!(left.x, 2.5 * h);
        assert_relative_eq!(left.y, -v);
        assert_eq!(left.role, NodeRole::Converged);
        assert_eq!(left.marker, MarkerKind::Star);
        assert_eq!(left.color, style.converged_color);

        let right = &layout.nodes[&3];
        assert_relative_eq!(right.x, 7.5 * h);
        assert_relative_eq!(right.y, -v);
        assert_eq!(right.role, NodeRole::Active);
        assert_eq!(right.marker, MarkerKind::Circle);
        assert_eq!(right.color, style.active_color);

        assert_eq!(layout.edges.len(), 2);
        assert_eq!((layout.edges[0].from, layout.edges[0].to), (1, 2));
        assert_eq!(layout.edges[0].color, style.dimension_colors[1]);
        assert_eq!(layout.edges[1].points[1], (right.x, right.y));
    }

    #[test]
    fn large_tree_uses_scaled_sizes() {
        let tree = balanced_tree(6, 3);
        let style = VisualizationStyle::default();
        let layout = compute_layout(&tree, &style);
        assert_eq!(layout.nodes.len(), 127);
        assert_eq!(layout.edges.len(), 126);
        assert!(layout.scale.size_scale < 1.0);
        for node in layout.nodes.values() {
            assert_eq!(node.size, layout.scale.node_size);
        }
        for edge in &layout.edges {
            assert_eq!(edge.width, layout.scale.edge_width);
        }
        assert_relative_eq!(layout.bounds.max_y, 0.0);
        assert_relative_eq!(layout.bounds.min_y, -6.0);
    }

    #[test]
    fn layout_is_deterministic() {
        let tree = balanced_tree(4, 2);
        let style = VisualizationStyle::default();
        let a = compute_layout(&tree, &style);
        let b = compute_layout(&tree, &style);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn cyclic_child_links_still_terminate() {
        let tree = SubdivisionTree {
            nodes: vec![
                internal(1, 0, None, 0.5, 0, 0.0, (2, 3)),
                internal(2, 1, Some(1), 0.2, 1, 0.0, (1, 2)),
                leaf(3, 1, Some(1), 0.1, false),
            ],
            root: 1,
        };
        let layout = compute_layout(&tree, &VisualizationStyle::default());
        assert_eq!(layout.nodes.len(), 3);
        assert_eq!(layout.edges.len(), 4);
    }

    #[test]
    fn title_summarises_tree() {
        let layout = compute_layout(&three_node_tree(0.5), &VisualizationStyle::default());
        assert_eq!(layout.title, "3 nodes · 2 leaves · 1 converged · depth 1");
    }
}
