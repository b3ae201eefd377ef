use crate::config::{Config, load_config};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, save_figure, write_output_png, write_output_svg};
use crate::source::{extract_tree, parse_tree_document};
use crate::theme::Theme;
use crate::{StyleConfig, VisualizationStyle};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stviz", version, about = "Render adaptive subdivision trees as SVG/PNG")]
pub struct Args {
    /// Tree file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format (defaults to the output file extension, else svg)
    #[arg(short = 'e', long = "outputFormat", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Config JSON file (theme, style and render overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Figure width in pixels (overrides auto-scaling)
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Figure height in pixels (overrides auto-scaling)
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Color active leaves by log error instead of a flat color
    #[arg(long = "gradient")]
    pub gradient: bool,

    /// Keep configured sizes regardless of tree size
    #[arg(long = "no-auto-scale")]
    pub no_auto_scale: bool,

    /// Omit the error-reduction term from split labels
    #[arg(long = "no-reduction")]
    pub no_reduction: bool,

    #[arg(long = "no-labels")]
    pub no_labels: bool,

    #[arg(long = "no-legend")]
    pub no_legend: bool,

    /// Also write the computed layout as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Log layout decisions to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    apply_args(&mut config, &args)?;

    let input = read_input(args.input.as_deref())?;
    let document = parse_tree_document(&input)?;
    let tree = extract_tree(&document)?;
    let layout = compute_layout(&tree, &config.style);

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &layout, &config.render)?;
    }

    let svg = render_svg(&layout, &config.theme, &config.render);
    write_figure(&svg, args.output.as_deref(), args.output_format, &config.theme)?;
    tracing::info!(
        nodes = layout.stats.node_count,
        leaves = layout.stats.leaf_count,
        "rendered subdivision tree"
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn apply_args(config: &mut Config, args: &Args) -> Result<()> {
    let mut style: StyleConfig = config.style.config().clone();
    if args.gradient {
        style.use_error_gradient = true;
    }
    if args.no_auto_scale {
        style.auto_scale = false;
    }
    if args.no_reduction {
        style.show_error_reduction = false;
    }
    if args.no_labels {
        style.show_labels = false;
    }
    if args.no_legend {
        style.show_legend = false;
    }
    config.style = VisualizationStyle::new(style)?;
    if args.width.is_some() {
        config.render.width = args.width;
    }
    if args.height.is_some() {
        config.render.height = args.height;
    }
    Ok(())
}

/// Without `-e` the output path's extension picks the format; SVG goes to
/// stdout when no path is given.
fn write_figure(
    svg: &str,
    output: Option<&Path>,
    format: Option<OutputFormat>,
    theme: &Theme,
) -> Result<()> {
    match (format, output) {
        (None, Some(path)) => save_figure(svg, path, theme),
        (Some(OutputFormat::Png), Some(path)) => write_output_png(svg, path, theme),
        (Some(OutputFormat::Png), None) => Err(anyhow::anyhow!("Output path required for png output")),
        (_, output) => write_output_svg(svg, output),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
