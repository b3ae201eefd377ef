use crate::error::StyleError;
use crate::theme::{Theme, parse_hex_color};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::Path;

const DIMENSION_COLORS: [&str; 8] = [
    "#1F77B4", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#17BECF", "#BCBD22", "#7F7F7F",
];

/// Raw style settings. Turn into a [`VisualizationStyle`] before laying out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    pub node_size: f32,
    pub min_node_size: f32,
    pub max_node_size: f32,
    pub font_size: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub edge_width: f32,
    pub min_edge_width: f32,
    pub min_size_scale: f32,
    pub max_size_scale: f32,
    pub min_font_scale: f32,
    pub max_font_scale: f32,
    /// Size shrink per doubling of the node count past the threshold.
    pub size_scale_slope: f32,
    pub auto_scale_threshold: usize,
    pub leaf_spread_threshold: usize,
    pub dimension_colors: Vec<String>,
    pub converged_color: String,
    pub active_color: String,
    pub edge_fallback_color: String,
    pub gradient_low_color: String,
    pub gradient_mid_color: String,
    pub gradient_high_color: String,
    pub use_error_gradient: bool,
    pub auto_scale: bool,
    pub horizontal_scale: f32,
    /// Width of the root's normalised interval before horizontal scaling.
    pub layout_width: f32,
    pub vertical_spacing: f32,
    pub origin: (f32, f32),
    pub label_max_chars: usize,
    pub label_sig_digits: usize,
    pub show_labels: bool,
    pub show_error_reduction: bool,
    pub show_legend: bool,
    pub figure_width_per_leaf: f32,
    pub figure_width_offset: f32,
    pub min_figure_width: f32,
    pub max_figure_width: f32,
    pub figure_height_per_level: f32,
    pub figure_height_offset: f32,
    pub min_figure_height: f32,
    pub max_figure_height: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            node_size: 18.0,
            min_node_size: 4.0,
            max_node_size: 40.0,
            font_size: 12.0,
            min_font_size: 7.0,
            max_font_size: 20.0,
            edge_width: 1.6,
            min_edge_width: 0.5,
            min_size_scale: 0.3,
            max_size_scale: 1.0,
            min_font_scale: 0.6,
            max_font_scale: 1.0,
            size_scale_slope: 0.15,
            auto_scale_threshold: 10,
            leaf_spread_threshold: 10,
            dimension_colors: DIMENSION_COLORS
                .iter()
                .map(|value| value.to_string())
                .collect(),
            converged_color: "#2CA02C".to_string(),
            active_color: "#FF7F0E".to_string(),
            edge_fallback_color: "#808080".to_string(),
            gradient_low_color: "#1A9850".to_string(),
            gradient_mid_color: "#FFFFBF".to_string(),
            gradient_high_color: "#D73027".to_string(),
            use_error_gradient: false,
            auto_scale: true,
            horizontal_scale: 1.0,
            layout_width: 10.0,
            vertical_spacing: 1.0,
            origin: (0.0, 0.0),
            label_max_chars: 14,
            label_sig_digits: 2,
            show_labels: true,
            show_error_reduction: true,
            show_legend: true,
            figure_width_per_leaf: 40.0,
            figure_width_offset: 400.0,
            min_figure_width: 600.0,
            max_figure_width: 2400.0,
            figure_height_per_level: 80.0,
            figure_height_offset: 200.0,
            min_figure_height: 400.0,
            max_figure_height: 1600.0,
        }
    }
}

impl StyleConfig {
    pub fn validate(&self) -> Result<(), StyleError> {
        let positive = [
            ("nodeSize", self.node_size),
            ("minNodeSize", self.min_node_size),
            ("maxNodeSize", self.max_node_size),
            ("fontSize", self.font_size),
            ("minFontSize", self.min_font_size),
            ("maxFontSize", self.max_font_size),
            ("edgeWidth", self.edge_width),
            ("minEdgeWidth", self.min_edge_width),
            ("minSizeScale", self.min_size_scale),
            ("maxSizeScale", self.max_size_scale),
            ("minFontScale", self.min_font_scale),
            ("maxFontScale", self.max_font_scale),
            ("horizontalScale", self.horizontal_scale),
            ("layoutWidth", self.layout_width),
            ("verticalSpacing", self.vertical_spacing),
            ("minFigureWidth", self.min_figure_width),
            ("maxFigureWidth", self.max_figure_width),
            ("minFigureHeight", self.min_figure_height),
            ("maxFigureHeight", self.max_figure_height),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(StyleError::NotPositive {
                    field,
                    value: value as f64,
                });
            }
        }
        if !self.size_scale_slope.is_finite() || self.size_scale_slope < 0.0 {
            return Err(StyleError::NotPositive {
                field: "sizeScaleSlope",
                value: self.size_scale_slope as f64,
            });
        }

        let bounds = [
            ("minNodeSize", "maxNodeSize", self.min_node_size, self.max_node_size),
            ("minFontSize", "maxFontSize", self.min_font_size, self.max_font_size),
            ("minSizeScale", "maxSizeScale", self.min_size_scale, self.max_size_scale),
            ("minFontScale", "maxFontScale", self.min_font_scale, self.max_font_scale),
            ("minFigureWidth", "maxFigureWidth", self.min_figure_width, self.max_figure_width),
            ("minFigureHeight", "maxFigureHeight", self.min_figure_height, self.max_figure_height),
        ];
        for (min_field, max_field, min, max) in bounds {
            if min > max {
                return Err(StyleError::InvertedBounds {
                    min_field,
                    max_field,
                    min: min as f64,
                    max: max as f64,
                });
            }
        }

        if self.dimension_colors.is_empty() {
            return Err(StyleError::EmptyPalette);
        }
        for value in &self.dimension_colors {
            check_color("dimensionColors", value)?;
        }
        check_color("convergedColor", &self.converged_color)?;
        check_color("activeColor", &self.active_color)?;
        check_color("edgeFallbackColor", &self.edge_fallback_color)?;
        check_color("gradientLowColor", &self.gradient_low_color)?;
        check_color("gradientMidColor", &self.gradient_mid_color)?;
        check_color("gradientHighColor", &self.gradient_high_color)?;

        if self.label_max_chars == 0 {
            return Err(StyleError::ZeroCount {
                field: "labelMaxChars",
            });
        }
        if self.label_sig_digits == 0 {
            return Err(StyleError::ZeroCount {
                field: "labelSigDigits",
            });
        }
        if self.auto_scale_threshold == 0 {
            return Err(StyleError::ZeroCount {
                field: "autoScaleThreshold",
            });
        }
        if self.leaf_spread_threshold == 0 {
            return Err(StyleError::ZeroCount {
                field: "leafSpreadThreshold",
            });
        }
        Ok(())
    }
}

fn check_color(field: &'static str, value: &str) -> Result<(), StyleError> {
    if parse_hex_color(value).is_none() {
        return Err(StyleError::InvalidColor {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// A [`StyleConfig`] that passed validation. Immutable for one render.
#[derive(Debug, Clone)]
pub struct VisualizationStyle(StyleConfig);

impl VisualizationStyle {
    pub fn new(config: StyleConfig) -> Result<Self, StyleError> {
        config.validate()?;
        Ok(Self(config))
    }

    pub fn config(&self) -> &StyleConfig {
        &self.0
    }
}

impl Default for VisualizationStyle {
    fn default() -> Self {
        Self(StyleConfig::default())
    }
}

impl Deref for VisualizationStyle {
    type Target = StyleConfig;

    fn deref(&self) -> &StyleConfig {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Overrides the auto-scaled figure width in pixels.
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub margin: f32,
    pub legend_width: f32,
    pub title_height: f32,
    pub show_title: bool,
    /// Skip font lookup and estimate text widths from the font size.
    pub fast_text_metrics: bool,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            margin: 40.0,
            legend_width: 170.0,
            title_height: 32.0,
            show_title: true,
            fast_text_metrics: false,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub style: VisualizationStyle,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            style: VisualizationStyle::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    font_family: Option<String>,
    style: Option<serde_json::Value>,
    render: Option<serde_json::Value>,
}

/// Loads a JSON config on top of the defaults. Style overrides are
/// validated here so that a bad file fails before any layout work.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    apply_config_str(&mut config, &contents)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn apply_config_str(config: &mut Config, contents: &str) -> anyhow::Result<()> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme {theme_name:?}"))?;
        config.render.background = config.theme.background.clone();
    }
    if let Some(font_family) = parsed.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(overrides) = parsed.style {
        let merged = merge_json(serde_json::to_value(config.style.config())?, overrides);
        let style: StyleConfig = serde_json::from_value(merged)?;
        config.style = VisualizationStyle::new(style)?;
    }
    if let Some(overrides) = parsed.render {
        let merged = merge_json(serde_json::to_value(&config.render)?, overrides);
        config.render = serde_json::from_value(merged)?;
    }
    Ok(())
}

fn merge_json(mut base: serde_json::Value, overrides: serde_json::Value) -> serde_json::Value {
    match (&mut base, overrides) {
        (serde_json::Value::Object(target), serde_json::Value::Object(source)) => {
            for (key, value) in source {
                let current = target.remove(&key).unwrap_or(serde_json::Value::Null);
                target.insert(key, merge_json(current, value));
            }
            base
        }
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_is_valid() {
        assert!(StyleConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = StyleConfig {
            min_node_size: 50.0,
            max_node_size: 10.0,
            ..StyleConfig::default()
        };
        assert!(matches!(
            VisualizationStyle::new(config),
            Err(StyleError::InvertedBounds {
                min_field: "minNodeSize",
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_positive_sizes_and_bad_colors() {
        let config = StyleConfig {
            font_size: 0.0,
            ..StyleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StyleError::NotPositive { field: "fontSize", .. })
        ));

        let config = StyleConfig {
            dimension_colors: vec!["#123456".to_string(), "teal".to_string()],
            ..StyleConfig::default()
        };
        assert!(matches!(config.validate(), Err(StyleError::InvalidColor { .. })));

        let config = StyleConfig {
            dimension_colors: Vec::new(),
            ..StyleConfig::default()
        };
        assert_eq!(config.validate(), Err(StyleError::EmptyPalette));
    }

    #[test]
    fn rejects_zero_label_length() {
        let config = StyleConfig {
            label_max_chars: 0,
            ..StyleConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(StyleError::ZeroCount {
                field: "labelMaxChars"
            })
        );
    }

    #[test]
    fn config_file_overrides_merge_with_defaults() {
        let mut config = Config::default();
        apply_config_str(
            &mut config,
            r#"{"theme": "modern", "style": {"useErrorGradient": true, "nodeSize": 22}, "render": {"margin": 12}}"#,
        )
        .unwrap();
        assert!(config.style.use_error_gradient);
        assert_eq!(config.style.node_size, 22.0);
        assert_eq!(config.style.font_size, 12.0);
        assert_eq!(config.render.margin, 12.0);
        assert_eq!(config.render.legend_width, 170.0);
        assert_eq!(config.theme.font_family, Theme::modern().font_family);
    }

    #[test]
    fn config_file_with_invalid_style_fails() {
        let mut config = Config::default();
        let err = apply_config_str(&mut config, r#"{"style": {"minFontSize": 30}}"#);
        assert!(err.is_err());
    }
}
