#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod source;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, RenderConfig, StyleConfig, VisualizationStyle, load_config};
pub use error::{RenderError, StyleError, TreeError};
pub use ir::{NodeId, NodeKind, SubdivisionTree, SubdomainNode, TreeStats};
pub use layout::{TreeLayout, compute_layout};
pub use render::{render_svg, save_figure};
pub use source::{SubdomainRecord, TreeDocument, TreeSource, extract_tree};
pub use theme::Theme;

/// Extracts, lays out and renders a tree in one call.
pub fn render_tree_svg<S: TreeSource + ?Sized>(source: &S, config: &Config) -> Result<String, TreeError> {
    let tree = extract_tree(source)?;
    let layout = compute_layout(&tree, &config.style);
    Ok(render_svg(&layout, &config.theme, &config.render))
}
