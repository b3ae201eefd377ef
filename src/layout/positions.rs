use super::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
    pub interval: (f32, f32),
}

/// Splits `[x_min, x_max]` at `(split_pos + 1) / 2` of its width.
pub fn split_interval(interval: (f64, f64), split_pos: f64) -> ((f64, f64), (f64, f64)) {
    let (x_min, x_max) = interval;
    let pos = if split_pos.is_finite() {
        split_pos.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let frac = (pos + 1.0) / 2.0;
    let cut = x_min + frac * (x_max - x_min);
    ((x_min, cut), (cut, x_max))
}

/// Places every node reachable from the root. The root owns
/// `[0, layout_width]`; children share their parent's interval in
/// proportion to the split position, and depth maps to `-vertical_spacing`
/// per level. A node reached twice keeps its first placement.
pub fn compute_positions(
    tree: &SubdivisionTree,
    style: &VisualizationStyle,
    horizontal_scale: f32,
) -> BTreeMap<NodeId, NodePosition> {
    let mut positions = BTreeMap::new();
    let (origin_x, origin_y) = style.origin;
    let h_scale = horizontal_scale as f64;
    let scale_x = |x: f64| (origin_x as f64 + x * h_scale) as f32;

    let mut stack: Vec<(NodeId, (f64, f64))> = vec![(tree.root, (0.0, style.layout_width as f64))];
    while let Some((id, interval)) = stack.pop() {
        if positions.contains_key(&id) {
            continue;
        }
        let Some(node) = tree.node(id) else {
            continue;
        };
        let mid = (interval.0 + interval.1) / 2.0;
        positions.insert(
            id,
            NodePosition {
                x: scale_x(mid),
                y: origin_y - node.depth as f32 * style.vertical_spacing,
                interval: (scale_x(interval.0), scale_x(interval.1)),
            },
        );
        if let NodeKind::Internal {
            split_pos,
            left,
            right,
            ..
        } = node.kind
        {
            let (left_interval, right_interval) = split_interval(interval, split_pos);
            stack.push((right, right_interval));
            stack.push((left, left_interval));
        }
    }
    positions
}
