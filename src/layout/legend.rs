use super::*;

use super::styling::dimension_color;

/// Legend rows: one per split dimension in the tree, then leaf statuses.
/// In gradient mode the active row is replaced by low/high error rows and
/// a gradient bar spanning the active error range.
pub fn build_legend(tree: &SubdivisionTree, style: &VisualizationStyle) -> Legend {
    if !style.show_legend {
        return Legend::default();
    }
    let mut entries: Vec<LegendEntry> = tree
        .split_dims()
        .into_iter()
        .map(|dim| LegendEntry {
            color: dimension_color(dim, &style.dimension_colors).to_string(),
            marker: MarkerKind::Square,
            label: format!("split x{dim}"),
        })
        .collect();

    let stats = tree.stats();
    if stats.converged_count > 0 {
        entries.push(LegendEntry {
            color: style.converged_color.clone(),
            marker: MarkerKind::Star,
            label: "converged".to_string(),
        });
    }

    let mut gradient = None;
    if stats.active_count > 0 {
        let range = tree
            .active_error_range()
            .filter(|(min, max)| max > min);
        match range {
            Some((min_error, max_error)) if style.use_error_gradient => {
                entries.push(LegendEntry {
                    color: style.gradient_low_color.clone(),
                    marker: MarkerKind::Circle,
                    label: "low error".to_string(),
                });
                entries.push(LegendEntry {
                    color: style.gradient_high_color.clone(),
                    marker: MarkerKind::Circle,
                    label: "high error".to_string(),
                });
                gradient = Some(GradientLegend {
                    low_color: style.gradient_low_color.clone(),
                    mid_color: style.gradient_mid_color.clone(),
                    high_color: style.gradient_high_color.clone(),
                    min_error,
                    max_error,
                });
            }
            _ => {
                let color = if style.use_error_gradient {
                    style.gradient_mid_color.clone()
                } else {
                    style.active_color.clone()
                };
                entries.push(LegendEntry {
                    color,
                    marker: MarkerKind::Circle,
                    label: "active".to_string(),
                });
            }
        }
    }

    Legend { entries, gradient }
}
