use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use choromap::config::{RenderConfig, RenderRequest};
use choromap::csv_reader;
use choromap::geometry::{self, GeoData, OverlayMesh};
use choromap::graph;
use choromap::join::{self, RowKey};
use choromap::palette::PaletteRegistry;
use choromap::runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Png,
    Svg,
}

#[derive(Parser, Debug)]
#[command(name = "choromap")]
#[command(about = "Render choropleth and proportional-symbol maps from CSV data", long_about = None)]
struct Args {
    #[arg(long, help = "GeoJSON feature collection of the mapped territories")]
    geometry: PathBuf,

    #[arg(long, help = "JSON render configuration (scales, titles, join keys)")]
    config: PathBuf,

    #[arg(long, help = "Delimited data file (reads stdin when omitted)")]
    data: Option<PathBuf>,

    #[arg(long, help = "Metric to map (the configuration's default entry when omitted)")]
    metric: Option<String>,

    #[arg(long, help = "Selected indicator key")]
    indicator: Option<String>,

    #[arg(long = "indicator-label", help = "Indicator label used in titles and tooltips")]
    indicator_label: Option<String>,

    #[arg(long, help = "Color scheme overriding the metric's own ('auto' keeps it)")]
    scheme: Option<String>,

    #[arg(long, default_value = ",", value_parser = csv_reader::parse_delimiter, help = "Field delimiter, or 'tab'")]
    delimiter: u8,

    #[arg(long = "overlay", help = "GeoJSON boundary mesh drawn above the regions (repeatable)")]
    overlays: Vec<PathBuf>,

    #[arg(long, help = "GeoJSON outline drawn above the overlays")]
    outline: Option<PathBuf>,

    #[arg(long, help = "GeoJSON shape filled under everything")]
    background: Option<PathBuf>,

    #[arg(long, requires_all = ["size_key", "size_column"], help = "Second data file holding symbol sizes")]
    sizes: Option<PathBuf>,

    #[arg(long = "size-key", help = "Join-key column of the sizes file")]
    size_key: Option<String>,

    #[arg(long = "size-column", help = "Column of the sizes file copied into the data rows")]
    size_column: Option<String>,

    #[arg(long, value_enum, default_value = "png", help = "Output format")]
    format: OutputFormat,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = RenderConfig::load(&args.config)?;

    let mut rows = match &args.data {
        Some(path) => csv_reader::read_rows_from_path(path, args.delimiter)?,
        None => csv_reader::read_rows_from_stdin(args.delimiter)?,
    };

    if let (Some(path), Some(size_key), Some(size_column)) = (&args.sizes, &args.size_key, &args.size_column) {
        let sizes = csv_reader::read_rows_from_path(path, args.delimiter)?;
        let attached = join::attach_column(
            &mut rows,
            &config.data_keys.row_key,
            size_column,
            &sizes,
            &RowKey::Column(size_key.clone()),
            size_column,
        );
        info!(attached, rows = rows.len(), "attached sizes");
    }

    let geo = load_geo(&args)?;

    let request = RenderRequest {
        metric: args.metric.clone(),
        indicator: args.indicator.clone(),
        indicator_label: args.indicator_label.clone(),
        scheme: args.scheme.clone(),
    };
    let registry = PaletteRegistry::builtin();
    let scene = runtime::render_map(&config, &request, &rows, &geo, &registry).context("Failed to render map")?;

    let bytes = match args.format {
        OutputFormat::Png => graph::render_png(&scene).context("Failed to draw PNG")?,
        OutputFormat::Svg => graph::render_svg(&scene).context("Failed to draw SVG")?.into_bytes(),
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(&bytes)
        .context("Failed to write image to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn load_geo(args: &Args) -> Result<GeoData> {
    let features = geometry::load_features(&args.geometry)?;
    info!(features = features.len(), "loaded features");

    let mut geo = GeoData::new(features);
    for path in &args.overlays {
        geo = geo.with_overlay(OverlayMesh::new(geometry::load_geometry(path)?));
    }
    if let Some(path) = &args.outline {
        geo = geo.with_outline(geometry::load_geometry(path)?);
    }
    if let Some(path) = &args.background {
        geo = geo.with_background(geometry::load_geometry(path)?);
    }
    Ok(geo)
}
