use thiserror::Error;

use crate::ir::NodeId;

/// Malformed input detected while converting an external tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("tree has no subdomains")]
    EmptyTree,
    #[error("root id {root} out of range (tree has {count} subdomains)")]
    RootOutOfRange { root: NodeId, count: usize },
    #[error("missing {field} on subdomain {id}")]
    MissingField { id: NodeId, field: &'static str },
    #[error("invalid {field} {value:?} on subdomain {id}")]
    InvalidField {
        id: NodeId,
        field: &'static str,
        value: String,
    },
    #[error("child id {child} of subdomain {parent} out of range (tree has {count} subdomains)")]
    ChildOutOfRange {
        parent: NodeId,
        child: NodeId,
        count: usize,
    },
    #[error("subdomain {child} is referenced as a child more than once")]
    SharedChild { child: NodeId },
}

/// Style configuration rejected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{min_field} ({min}) exceeds {max_field} ({max})")]
    InvertedBounds {
        min_field: &'static str,
        max_field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("dimension palette is empty")]
    EmptyPalette,
    #[error("invalid color {value:?} for {field}")]
    InvalidColor { field: &'static str, value: String },
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported output extension {0:?} (expected svg or png)")]
    UnsupportedFormat(String),
    #[error("PNG output requires the `png` feature")]
    PngDisabled,
}
