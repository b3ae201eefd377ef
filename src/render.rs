use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::layout::labels::format_sig;
use crate::layout::{Bounds, Legend, MarkerKind, TreeLayout};
use crate::text_metrics::text_width;
use crate::theme::Theme;
use anyhow::Result;
use std::f32::consts::PI;
use std::path::Path;

const LEGEND_ROW_HEIGHT: f32 = 22.0;
const LEGEND_MARKER_SIZE: f32 = 12.0;
const LEGEND_PADDING: f32 = 10.0;
const GRADIENT_BAR_HEIGHT: f32 = 10.0;
const MARKER_STROKE: &str = "#333333";

/// Output format picked from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureFormat {
    Svg,
    Png,
}

impl FigureFormat {
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(RenderError::UnsupportedFormat(ext)),
        }
    }
}

/// Maps layout coordinates into the plot area of the canvas.
struct Viewport {
    bounds: Bounds,
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

impl Viewport {
    fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let px = if self.bounds.width() > f32::EPSILON {
            self.left + (x - self.bounds.min_x) / self.bounds.width() * self.width
        } else {
            self.left + self.width / 2.0
        };
        let py = if self.bounds.height() > f32::EPSILON {
            self.top + (self.bounds.max_y - y) / self.bounds.height() * self.height
        } else {
            self.top + self.height / 2.0
        };
        (px, py)
    }
}

pub fn canvas_size(layout: &TreeLayout, config: &RenderConfig) -> (f32, f32) {
    let width = config.width.unwrap_or(layout.scale.figure_width).max(200.0);
    let height = config.height.unwrap_or(layout.scale.figure_height).max(200.0);
    (width, height)
}

pub fn render_svg(layout: &TreeLayout, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let (width, height) = canvas_size(layout, config);
    let font_size = layout.scale.font_size;
    let max_marker = layout
        .nodes
        .values()
        .map(|n| n.size)
        .fold(0.0f32, f32::max);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    if let Some(gradient) = &layout.legend.gradient {
        svg.push_str("<defs>");
        svg.push_str(&format!(
            "<linearGradient id=\"error-gradient\" x1=\"0\" y1=\"0\" x2=\"1\" y2=\"0\"><stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"0.5\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/></linearGradient>",
            gradient.low_color, gradient.mid_color, gradient.high_color
        ));
        svg.push_str("</defs>");
    }

    let title_band = if config.show_title && !layout.title.is_empty() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            width / 2.0,
            config.margin / 2.0 + theme.title_font_size,
            escape_xml(&theme.font_family),
            theme.title_font_size,
            theme.text_color,
            escape_xml(&layout.title)
        ));
        config.title_height
    } else {
        0.0
    };

    let legend_band = if layout.legend.is_empty() {
        0.0
    } else {
        legend_box_width(&layout.legend, theme, config, font_size).max(config.legend_width)
    };
    let pad = config.margin + max_marker / 2.0;
    let viewport = Viewport {
        bounds: layout.bounds,
        left: pad,
        top: pad + title_band,
        width: (width - legend_band - pad * 2.0).max(1.0),
        height: (height - title_band - pad * 2.0 - font_size * 1.5).max(1.0),
    };

    svg.push_str("<g class=\"edges\">");
    for edge in &layout.edges {
        let (x1, y1) = viewport.project(edge.points[0].0, edge.points[0].1);
        let (x2, y2) = viewport.project(edge.points[1].0, edge.points[1].1);
        svg.push_str(&format!(
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linecap=\"round\"/>",
            edge.color, edge.width
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for node in layout.nodes.values() {
        let (cx, cy) = viewport.project(node.x, node.y);
        svg.push_str(&marker_svg(node.marker, cx, cy, node.size, &node.color));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"labels\">");
    for node in layout.nodes.values() {
        if node.label.is_empty() {
            continue;
        }
        let (cx, cy) = viewport.project(node.x, node.y);
        svg.push_str(&format!(
            "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"3\" paint-order=\"stroke\">{}</text>",
            cy + node.size / 2.0 + font_size,
            escape_xml(&theme.font_family),
            font_size,
            theme.text_color,
            theme.label_background,
            escape_xml(&node.label)
        ));
    }
    svg.push_str("</g>");

    if !layout.legend.is_empty() {
        let x = width - legend_band - config.margin / 2.0;
        svg.push_str(&legend_svg(&layout.legend, x, pad + title_band, legend_band, theme, font_size));
    }

    svg.push_str("</svg>");
    svg
}

fn marker_svg(kind: MarkerKind, cx: f32, cy: f32, size: f32, color: &str) -> String {
    let r = size / 2.0;
    match kind {
        MarkerKind::Circle => format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{color}\" stroke=\"{MARKER_STROKE}\" stroke-width=\"0.8\"/>"
        ),
        MarkerKind::Square => format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" fill=\"{color}\" stroke=\"{MARKER_STROKE}\" stroke-width=\"0.8\"/>",
            cx - r,
            cy - r
        ),
        MarkerKind::Star => format!(
            "<polygon points=\"{}\" fill=\"{color}\" stroke=\"{MARKER_STROKE}\" stroke-width=\"0.8\"/>",
            star_points(cx, cy, r * 1.2, r * 0.5)
        ),
    }
}

/// Five-pointed star, first point straight up.
fn star_points(cx: f32, cy: f32, outer: f32, inner: f32) -> String {
    let mut points = Vec::with_capacity(10);
    for i in 0..10 {
        let radius = if i % 2 == 0 { outer } else { inner };
        let angle = -PI / 2.0 + i as f32 * PI / 5.0;
        points.push(format!(
            "{:.2},{:.2}",
            cx + radius * angle.cos(),
            cy + radius * angle.sin()
        ));
    }
    points.join(" ")
}

fn legend_box_width(legend: &Legend, theme: &Theme, config: &RenderConfig, font_size: f32) -> f32 {
    let widest = legend
        .entries
        .iter()
        .map(|e| text_width(&e.label, font_size, &theme.font_family, config.fast_text_metrics))
        .fold(0.0f32, f32::max);
    widest + LEGEND_MARKER_SIZE + LEGEND_PADDING * 3.0
}

fn legend_svg(
    legend: &Legend,
    x: f32,
    y: f32,
    width: f32,
    theme: &Theme,
    font_size: f32,
) -> String {
    let gradient_rows = if legend.gradient.is_some() { 2.0 } else { 0.0 };
    let height = LEGEND_PADDING * 2.0
        + legend.entries.len() as f32 * LEGEND_ROW_HEIGHT
        + gradient_rows * LEGEND_ROW_HEIGHT;
    let mut svg = String::from("<g class=\"legend\">");
    svg.push_str(&format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
        theme.legend_background, theme.legend_border
    ));

    let marker_x = x + LEGEND_PADDING + LEGEND_MARKER_SIZE / 2.0;
    let text_x = x + LEGEND_PADDING * 2.0 + LEGEND_MARKER_SIZE;
    let mut row_y = y + LEGEND_PADDING + LEGEND_ROW_HEIGHT / 2.0;
    for entry in &legend.entries {
        svg.push_str(&marker_svg(entry.marker, marker_x, row_y, LEGEND_MARKER_SIZE, &entry.color));
        svg.push_str(&legend_text(text_x, row_y + font_size * 0.35, "start", &entry.label, theme, font_size));
        row_y += LEGEND_ROW_HEIGHT;
    }

    if let Some(gradient) = &legend.gradient {
        let bar_x = x + LEGEND_PADDING;
        let bar_width = (width - LEGEND_PADDING * 2.0).max(1.0);
        svg.push_str(&format!(
            "<rect x=\"{bar_x:.2}\" y=\"{:.2}\" width=\"{bar_width:.2}\" height=\"{GRADIENT_BAR_HEIGHT}\" fill=\"url(#error-gradient)\" stroke=\"{}\" stroke-width=\"0.5\"/>",
            row_y - GRADIENT_BAR_HEIGHT / 2.0,
            theme.legend_border
        ));
        let text_y = row_y + LEGEND_ROW_HEIGHT;
        let digits = 2;
        svg.push_str(&legend_text(bar_x, text_y, "start", &format_sig(gradient.min_error, digits), theme, font_size));
        svg.push_str(&legend_text(bar_x + bar_width, text_y, "end", &format_sig(gradient.max_error, digits), theme, font_size));
    }
    svg.push_str("</g>");
    svg
}

fn legend_text(x: f32, y: f32, anchor: &str, text: &str, theme: &Theme, font_size: f32) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{font_size:.2}\" fill=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.text_color,
        escape_xml(text)
    )
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|f| f.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _theme: &Theme) -> Result<()> {
    Err(RenderError::PngDisabled.into())
}

/// Writes the figure in the format implied by the path's extension.
pub fn save_figure(svg: &str, path: &Path, theme: &Theme) -> Result<()> {
    match FigureFormat::from_path(path)? {
        FigureFormat::Svg => write_output_svg(svg, Some(path)),
        FigureFormat::Png => write_output_png(svg, path, theme),
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StyleConfig, VisualizationStyle};
    use crate::ir::test_support::*;
    use crate::layout::compute_layout;
    use tempfile::TempDir;

    fn fast_config() -> RenderConfig {
        RenderConfig {
            fast_text_metrics: true,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn render_svg_basic() {
        let layout = compute_layout(&three_node_tree(0.5), &VisualizationStyle::default());
        let svg = render_svg(&layout, &Theme::classic(), &fast_config());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("<polygon"));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("x1 ↓"));
        assert!(svg.contains("converged"));
        assert_eq!(svg.matches("<line").count(), 2);
    }

    #[test]
    fn gradient_legend_emits_definition() {
        let style = VisualizationStyle::new(StyleConfig {
            use_error_gradient: true,
            ..StyleConfig::default()
        })
        .unwrap();
        let layout = compute_layout(&balanced_tree(3, 2), &style);
        let svg = render_svg(&layout, &Theme::modern(), &fast_config());
        assert!(svg.contains("linearGradient id=\"error-gradient\""));
        assert!(svg.contains("url(#error-gradient)"));
        assert!(svg.contains("low error"));
    }

    #[test]
    fn single_node_is_centred_without_nan() {
        let tree = crate::ir::SubdivisionTree {
            nodes: vec![leaf(1, 0, None, 0.2, false)],
            root: 1,
        };
        let layout = compute_layout(&tree, &VisualizationStyle::default());
        let svg = render_svg(&layout, &Theme::classic(), &fast_config());
        assert!(!svg.contains("NaN"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn canvas_size_honours_overrides() {
        let layout = compute_layout(&three_node_tree(0.5), &VisualizationStyle::default());
        let config = RenderConfig {
            width: Some(900.0),
            ..fast_config()
        };
        assert_eq!(canvas_size(&layout, &config), (900.0, 400.0));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(FigureFormat::from_path(Path::new("a/tree.SVG")).unwrap(), FigureFormat::Svg);
        assert_eq!(FigureFormat::from_path(Path::new("tree.png")).unwrap(), FigureFormat::Png);
        assert!(FigureFormat::from_path(Path::new("tree.pdf")).is_err());
    }

    #[test]
    fn save_figure_writes_svg_by_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tree.svg");
        let layout = compute_layout(&three_node_tree(0.5), &VisualizationStyle::default());
        let svg = render_svg(&layout, &Theme::classic(), &fast_config());
        save_figure(&svg, &path, &Theme::classic()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), svg);
    }

    #[test]
    fn save_figure_rejects_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tree.pdf");
        let err = save_figure("<svg/>", &path, &Theme::classic()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::UnsupportedFormat(ext)) if ext == "pdf"
        ));
        assert!(!path.exists());
    }

    #[cfg(feature = "png")]
    #[test]
    fn save_figure_rasterises_png() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tree.png");
        let layout = compute_layout(&three_node_tree(0.5), &VisualizationStyle::default());
        let svg = render_svg(&layout, &Theme::classic(), &fast_config());
        save_figure(&svg, &path, &Theme::classic()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("a<b & 'c'"), "a&lt;b &amp; &apos;c&apos;");
    }
}
