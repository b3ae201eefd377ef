use crate::config::RenderConfig;
use crate::ir::{NodeId, TreeStats};
use crate::layout::{Legend, ScaleFactors, TreeLayout};
use crate::render::canvas_size;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub stats: TreeStats,
    pub scale: ScaleFactors,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub legend: Legend,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: NodeId,
    pub role: String,
    pub marker: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub x_min: f32,
    pub x_max: f32,
    pub depth: usize,
    pub size: f32,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: NodeId,
    pub to: NodeId,
    pub color: String,
    pub width: f32,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &TreeLayout, render: &RenderConfig) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id,
                role: format!("{:?}", node.role).to_ascii_lowercase(),
                marker: format!("{:?}", node.marker).to_ascii_lowercase(),
                color: node.color.clone(),
                x: node.x,
                y: node.y,
                x_min: node.interval.0,
                x_max: node.interval.1,
                depth: node.depth,
                size: node.size,
                label: node.label.clone(),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from,
                to: edge.to,
                color: edge.color.clone(),
                width: edge.width,
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        let (width, height) = canvas_size(layout, render);
        LayoutDump {
            width,
            height,
            title: layout.title.clone(),
            stats: layout.stats,
            scale: layout.scale,
            nodes,
            edges,
            legend: layout.legend.clone(),
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &TreeLayout, render: &RenderConfig) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, render);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizationStyle;
    use crate::ir::test_support::three_node_tree;
    use crate::layout::compute_layout;

    #[test]
    fn dump_flattens_nodes_and_edges() {
        let layout = compute_layout(&three_node_tree(0.5), &VisualizationStyle::default());
        let dump = LayoutDump::from_layout(&layout, &RenderConfig::default());
        assert_eq!(dump.nodes.len(), 3);
        assert_eq!(dump.nodes[1].marker, "star");
        assert_eq!(dump.nodes[0].role, "internal");
        assert_eq!(dump.edges[1].points.len(), 2);
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["stats"]["node_count"], 3);
        assert_eq!(json["width"], 600.0);
    }
}
