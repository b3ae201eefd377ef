/// 1-based subdomain index, unique within one tree.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Leaf {
        converged: bool,
    },
    Internal {
        split_dim: usize,
        split_pos: f64,
        left: NodeId,
        right: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubdomainNode {
    pub id: NodeId,
    pub depth: usize,
    pub l2_error: f64,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl SubdomainNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn is_converged(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { converged: true })
    }

    pub fn split_dim(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Internal { split_dim, .. } => Some(split_dim),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn split_pos(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Internal { split_pos, .. } => Some(split_pos),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Internal { left, right, .. } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct TreeStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub converged_count: usize,
    pub active_count: usize,
    pub max_depth: usize,
}

/// Owned snapshot of a subdivision tree. Built once by
/// [`crate::source::extract_tree`] and never mutated by the layout code.
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionTree {
    pub nodes: Vec<SubdomainNode>,
    pub root: NodeId,
}

impl SubdivisionTree {
    pub fn node(&self, id: NodeId) -> Option<&SubdomainNode> {
        id.checked_sub(1).and_then(|idx| self.nodes.get(idx))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            node_count: self.nodes.len(),
            ..TreeStats::default()
        };
        for node in &self.nodes {
            stats.max_depth = stats.max_depth.max(node.depth);
            if let NodeKind::Leaf { converged } = node.kind {
                stats.leaf_count += 1;
                if converged {
                    stats.converged_count += 1;
                } else {
                    stats.active_count += 1;
                }
            }
        }
        stats
    }

    /// Min/max over active leaves of finite, strictly positive errors.
    pub fn active_error_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for node in &self.nodes {
            if !matches!(node.kind, NodeKind::Leaf { converged: false }) {
                continue;
            }
            let err = node.l2_error;
            if !err.is_finite() || err <= 0.0 {
                continue;
            }
            range = Some(match range {
                Some((lo, hi)) => (lo.min(err), hi.max(err)),
                None => (err, err),
            });
        }
        range
    }

    pub fn split_dims(&self) -> Vec<usize> {
        let mut dims: Vec<usize> = self.nodes.iter().filter_map(|n| n.split_dim()).collect();
        dims.sort_unstable();
        dims.dedup();
        dims
    }

    /// Ids reachable from the root, parents before children, left before right.
    /// Each node is yielded at most once, even if child links form a cycle.
    pub fn preorder(&self) -> Preorder<'_> {
        let stack = if self.node(self.root).is_some() {
            vec![self.root]
        } else {
            Vec::new()
        };
        Preorder {
            tree: self,
            stack,
            seen: vec![false; self.nodes.len()],
        }
    }
}

pub struct Preorder<'a> {
    tree: &'a SubdivisionTree,
    stack: Vec<NodeId>,
    seen: Vec<bool>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a SubdomainNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            if std::mem::replace(&mut self.seen[id - 1], true) {
                continue;
            }
            if let Some((left, right)) = node.children() {
                self.stack.push(right);
                self.stack.push(left);
            }
            return Some(node);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn leaf(id: NodeId, depth: usize, parent: Option<NodeId>, err: f64, converged: bool) -> SubdomainNode {
        SubdomainNode {
            id,
            depth,
            l2_error: err,
            parent,
            kind: NodeKind::Leaf { converged },
        }
    }

    pub(crate) fn internal(
        id: NodeId,
        depth: usize,
        parent: Option<NodeId>,
        err: f64,
        split_dim: usize,
        split_pos: f64,
        children: (NodeId, NodeId),
    ) -> SubdomainNode {
        SubdomainNode {
            id,
            depth,
            l2_error: err,
            parent,
            kind: NodeKind::Internal {
                split_dim,
                split_pos,
                left: children.0,
                right: children.1,
            },
        }
    }

    /// Root split at dim 1, pos 0; left leaf converged (1e-6), right active (0.01).
    pub(crate) fn three_node_tree(root_error: f64) -> SubdivisionTree {
        SubdivisionTree {
            nodes: vec![
                internal(1, 0, None, root_error, 1, 0.0, (2, 3)),
                leaf(2, 1, Some(1), 1e-6, true),
                leaf(3, 1, Some(1), 0.01, false),
            ],
            root: 1,
        }
    }

    /// Complete binary tree of the given depth, splitting dims round-robin.
    pub(crate) fn balanced_tree(depth: usize, dims: usize) -> SubdivisionTree {
        let count = (1usize << (depth + 1)) - 1;
        let mut nodes = Vec::with_capacity(count);
        for id in 1..=count {
            let level = usize::BITS as usize - 1 - id.leading_zeros() as usize;
            let parent = if id == 1 { None } else { Some(id / 2) };
            let err = 10f64.powi(-(level as i32)) * (1.0 + (id % 3) as f64);
            if level == depth {
                nodes.push(leaf(id, level, parent, err, id % 2 == 0));
            } else {
                nodes.push(internal(id, level, parent, err, level % dims, 0.0, (2 * id, 2 * id + 1)));
            }
        }
        SubdivisionTree { nodes, root: 1 }
    }
}
