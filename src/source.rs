//! Boundary between an external subdivision-tree producer and the layout code.
//!
//! Producers implement [`TreeSource`] (or serialise a [`TreeDocument`]); the
//! tree is converted exactly once by [`extract_tree`] into an owned
//! [`SubdivisionTree`]. Nothing past this module looks at raw records.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::ir::{NodeId, NodeKind, SubdivisionTree, SubdomainNode};

/// Fixed record shape read from a producer for one subdomain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubdomainRecord {
    pub children: Option<[NodeId; 2]>,
    pub split_dim: Option<usize>,
    pub split_pos: Option<f64>,
    pub l2_error: Option<f64>,
    pub depth: Option<usize>,
    pub parent_id: Option<NodeId>,
}

pub trait TreeSource {
    fn subdomain_count(&self) -> usize;
    /// Record for a 1-based id. Producers report absent records and
    /// unreadable fields here.
    fn subdomain(&self, id: NodeId) -> Result<SubdomainRecord, TreeError>;
    fn root_id(&self) -> NodeId;
    /// Leaves listed here are converged; every other leaf is active.
    fn converged_ids(&self) -> Vec<NodeId>;
    /// Informational only: logged during extraction, never consulted for
    /// leaf status.
    fn active_ids(&self) -> Vec<NodeId>;
}

pub fn extract_tree<S: TreeSource + ?Sized>(source: &S) -> Result<SubdivisionTree, TreeError> {
    let count = source.subdomain_count();
    if count == 0 {
        return Err(TreeError::EmptyTree);
    }
    let root = source.root_id();
    if root == 0 || root > count {
        return Err(TreeError::RootOutOfRange { root, count });
    }
    let converged: HashSet<NodeId> = source.converged_ids().into_iter().collect();

    let mut claimed = vec![false; count];
    claimed[root - 1] = true;
    let mut nodes = Vec::with_capacity(count);
    for id in 1..=count {
        let record = source.subdomain(id)?;
        let l2_error = record.l2_error.ok_or(TreeError::MissingField {
            id,
            field: "l2_error",
        })?;
        let depth = record.depth.ok_or(TreeError::MissingField { id, field: "depth" })?;

        let kind = match record.children {
            Some([left, right]) => {
                for child in [left, right] {
                    if child == 0 || child > count {
                        return Err(TreeError::ChildOutOfRange {
                            parent: id,
                            child,
                            count,
                        });
                    }
                    if std::mem::replace(&mut claimed[child - 1], true) {
                        return Err(TreeError::SharedChild { child });
                    }
                }
                let split_dim = record.split_dim.ok_or(TreeError::MissingField {
                    id,
                    field: "split_dim",
                })?;
                let split_pos = record.split_pos.unwrap_or_else(|| {
                    tracing::debug!(id, "internal subdomain without split_pos, using even split");
                    0.0
                });
                NodeKind::Internal {
                    split_dim,
                    split_pos,
                    left,
                    right,
                }
            }
            None => NodeKind::Leaf {
                converged: converged.contains(&id),
            },
        };

        nodes.push(SubdomainNode {
            id,
            depth,
            l2_error,
            parent: record.parent_id,
            kind,
        });
    }

    let tree = SubdivisionTree { nodes, root };
    tracing::debug!(
        nodes = tree.len(),
        root,
        converged = converged.len(),
        active = source.active_ids().len(),
        "extracted subdivision tree"
    );
    Ok(tree)
}

/// Serialised tree as written by the refinement tooling. Record position
/// in `subdomains` is its id (first record is id 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDocument {
    pub root: NodeId,
    #[serde(default)]
    pub converged: Vec<NodeId>,
    #[serde(default)]
    pub active: Vec<NodeId>,
    pub subdomains: Vec<SubdomainEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubdomainEntry {
    #[serde(default)]
    pub children: Option<[NodeId; 2]>,
    #[serde(default)]
    pub split_dim: Option<usize>,
    #[serde(default)]
    pub split_pos: Option<f64>,
    #[serde(default)]
    pub l2_error: Option<ErrorValue>,
    #[serde(default)]
    pub depth: Option<usize>,
    #[serde(default, alias = "parent")]
    pub parent_id: Option<NodeId>,
}

/// Plain JSON has no infinity literal, so errors may also arrive as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorValue {
    Number(f64),
    String(String),
}

impl ErrorValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ErrorValue::Number(val) => Some(*val),
            ErrorValue::String(val) => match val.trim() {
                "inf" | "Inf" | "+inf" | "Infinity" | "+Infinity" => Some(f64::INFINITY),
                "nan" | "NaN" => Some(f64::NAN),
                other => other.parse::<f64>().ok(),
            },
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorValue::Number(val) => write!(f, "{val}"),
            ErrorValue::String(val) => f.write_str(val),
        }
    }
}

impl TreeSource for TreeDocument {
    fn subdomain_count(&self) -> usize {
        self.subdomains.len()
    }

    fn subdomain(&self, id: NodeId) -> Result<SubdomainRecord, TreeError> {
        let entry = id
            .checked_sub(1)
            .and_then(|idx| self.subdomains.get(idx))
            .ok_or(TreeError::MissingField { id, field: "record" })?;
        let l2_error = match &entry.l2_error {
            Some(value) => Some(value.as_f64().ok_or_else(|| TreeError::InvalidField {
                id,
                field: "l2_error",
                value: value.to_string(),
            })?),
            None => None,
        };
        Ok(SubdomainRecord {
            children: entry.children,
            split_dim: entry.split_dim,
            split_pos: entry.split_pos,
            l2_error,
            depth: entry.depth,
            parent_id: entry.parent_id,
        })
    }

    fn root_id(&self) -> NodeId {
        self.root
    }

    fn converged_ids(&self) -> Vec<NodeId> {
        self.converged.clone()
    }

    fn active_ids(&self) -> Vec<NodeId> {
        self.active.clone()
    }
}

/// Parses strict JSON first and falls back to JSON5 (comments, `Infinity`).
pub fn parse_tree_document(input: &str) -> anyhow::Result<TreeDocument> {
    match serde_json::from_str::<TreeDocument>(input) {
        Ok(doc) => Ok(doc),
        Err(json_err) => json5::from_str::<TreeDocument>(input).map_err(|json5_err| {
            anyhow::anyhow!("invalid tree document: {json_err} (as JSON5: {json5_err})")
        }),
    }
}

pub fn load_tree(path: &Path) -> anyhow::Result<SubdivisionTree> {
    let contents = std::fs::read_to_string(path)?;
    let doc = parse_tree_document(&contents)?;
    Ok(extract_tree(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(children: Option<[NodeId; 2]>, err: f64, depth: usize) -> SubdomainEntry {
        SubdomainEntry {
            children,
            split_dim: children.map(|_| 1),
            split_pos: children.map(|_| 0.0),
            l2_error: Some(ErrorValue::Number(err)),
            depth: Some(depth),
            parent_id: None,
        }
    }

    fn three_node_doc() -> TreeDocument {
        TreeDocument {
            root: 1,
            converged: vec![2],
            active: vec![3],
            subdomains: vec![
                entry(Some([2, 3]), 0.5, 0),
                entry(None, 1e-6, 1),
                entry(None, 0.01, 1),
            ],
        }
    }

    #[test]
    fn extracts_tagged_nodes() {
        let tree = extract_tree(&three_node_doc()).unwrap();
        assert_eq!(tree.root, 1);
        assert_eq!(tree.nodes[0].split_dim(), Some(1));
        assert!(tree.nodes[1].is_converged());
        assert!(tree.nodes[2].is_leaf());
        assert!(!tree.nodes[2].is_converged());
    }

    #[test]
    fn rejects_child_out_of_range() {
        let mut doc = three_node_doc();
        doc.subdomains[0].children = Some([2, 7]);
        assert_eq!(
            extract_tree(&doc),
            Err(TreeError::ChildOutOfRange {
                parent: 1,
                child: 7,
                count: 3
            })
        );
    }

    #[test]
    fn rejects_missing_split_dim_on_internal_node() {
        let mut doc = three_node_doc();
        doc.subdomains[0].split_dim = None;
        assert_eq!(
            extract_tree(&doc),
            Err(TreeError::MissingField {
                id: 1,
                field: "split_dim"
            })
        );
    }

    #[test]
    fn rejects_missing_error_and_bad_root() {
        let mut doc = three_node_doc();
        doc.subdomains[2].l2_error = None;
        assert!(matches!(
            extract_tree(&doc),
            Err(TreeError::MissingField { id: 3, field: "l2_error" })
        ));

        let mut doc = three_node_doc();
        doc.root = 0;
        assert!(matches!(extract_tree(&doc), Err(TreeError::RootOutOfRange { .. })));
    }

    #[test]
    fn unreadable_error_is_reported_as_invalid_not_missing() {
        let mut doc = three_node_doc();
        doc.subdomains[0].l2_error = Some(ErrorValue::String("abc".to_string()));
        assert_eq!(
            extract_tree(&doc),
            Err(TreeError::InvalidField {
                id: 1,
                field: "l2_error",
                value: "abc".to_string()
            })
        );

        let doc = parse_tree_document(r#"{"root": 1, "subdomains": [{"l2_error": "abc", "depth": 0}]}"#)
            .unwrap();
        let err = extract_tree(&doc).unwrap_err();
        assert_eq!(err.to_string(), "invalid l2_error \"abc\" on subdomain 1");
    }

    #[test]
    fn rejects_shared_children_and_root_as_child() {
        let mut doc = three_node_doc();
        doc.subdomains[0].children = Some([2, 2]);
        assert_eq!(extract_tree(&doc), Err(TreeError::SharedChild { child: 2 }));

        let mut doc = three_node_doc();
        doc.subdomains[0].children = Some([1, 3]);
        assert_eq!(extract_tree(&doc), Err(TreeError::SharedChild { child: 1 }));
    }

    #[test]
    fn missing_split_pos_defaults_to_even_split() {
        let mut doc = three_node_doc();
        doc.subdomains[0].split_pos = None;
        let tree = extract_tree(&doc).unwrap();
        assert_eq!(tree.nodes[0].split_pos(), Some(0.0));
    }

    #[test]
    fn parses_infinite_errors_from_json_and_json5() {
        let json = r#"{"root": 1, "subdomains": [{"l2_error": "inf", "depth": 0}]}"#;
        let doc = parse_tree_document(json).unwrap();
        let tree = extract_tree(&doc).unwrap();
        assert!(tree.nodes[0].l2_error.is_infinite());

        let json5 = "{root: 1, // root only\n subdomains: [{l2_error: Infinity, depth: 0}]}";
        let doc = parse_tree_document(json5).unwrap();
        let tree = extract_tree(&doc).unwrap();
        assert!(tree.nodes[0].l2_error.is_infinite());
    }

    #[test]
    fn empty_document_is_an_error() {
        let doc = parse_tree_document(r#"{"root": 1, "subdomains": []}"#).unwrap();
        assert_eq!(extract_tree(&doc), Err(TreeError::EmptyTree));
    }
}
