// Runtime executor: one render call from rows and features to a scene graph

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::centroid;
use crate::color;
use crate::compiler::{self, LayerContext};
use crate::config::{RenderConfig, RenderRequest, SymbolConfig};
use crate::domain::{self, DomainFamily};
use crate::error::RenderError;
use crate::geometry::GeoData;
use crate::ir::{OutlineHint, ResolvedRender, SceneGraph, SceneLayer};
use crate::join::{DataRow, JoinIndex, ValueSource};
use crate::palette::{DivergingSampling, PaletteRegistry, Sampling, SchemeKind};
use crate::resolve::{self, resolve_render};
use crate::scale::{ColorScale, PercentMode, ScaleKind, SizeScale};
use crate::tooltip::{SecondaryMetric, TooltipBuilder, TooltipTemplate, ValueFormat};

/// Bins of a quantize scale over an explicit extent.
const QUANTIZE_BINS: usize = 5;
const DIVERGING_OUTLINE: &str = "#333333";
const DEFAULT_OUTLINE: &str = "#222";
const FALLBACK_SEQUENTIAL: &str = "blues";
const FALLBACK_DIVERGING: &str = "rdbu";
/// Last resort when the registry knows neither the scheme nor the fallbacks.
const FALLBACK_COLORS: [&str; 5] = ["#deebf7", "#9ecae1", "#6baed6", "#3182bd", "#08519c"];

/// Render one map: resolve the request, join the rows, compute the domain and
/// palette, then compose the layers.
///
/// Only configuration problems fail; data problems degrade to unknown fills.
pub fn render_map<'g>(
    config: &RenderConfig,
    request: &RenderRequest,
    rows: &[DataRow],
    geo: &'g GeoData,
    registry: &PaletteRegistry,
) -> Result<SceneGraph<'g>, RenderError> {
    let resolved = resolve_render(config, request, registry)?;

    let renderer: Box<dyn Renderer + '_> = match &config.symbols {
        Some(symbols) => Box::new(SymbolRenderer { symbols }),
        None => Box::new(ChoroplethRenderer),
    };

    // 1. Rows taking part in this render
    let rows = filter_rows(rows, resolved.row_filter.as_ref());

    // 2. Join, then everything the data decides
    let join = JoinIndex::build(&rows, &resolved.join_rules);
    let domain = domain::compute_domain(resolved.family, resolved.explicit_domain.as_deref(), &join.values());
    let colors = build_palette(&resolved, &domain, registry);
    let stroke = outline_stroke(&resolved.outline, &colors, registry);
    debug!(metric = %resolved.metric, ?domain, colors = colors.len(), %stroke, "resolved color scale");

    let color_scale = ColorScale {
        kind: resolved.kind,
        scheme: resolved.scheme.clone(),
        colors,
        domain,
        unknown: config.style.unknown_fill(config.is_symbol_map()).to_string(),
        clamp: resolved.clamp,
        label: metric_label(&resolved.label, &resolved.metric).to_string(),
        tick_format: resolved.tick_format,
        legend: resolved.legend,
    };
    let size_scale = renderer.size_scale(&join);

    // 3. Tooltips
    let secondary = secondary_metric(config, &resolved.metric);
    let mut tooltip = TooltipBuilder::new(
        config.tooltip.template,
        ValueFormat::new(&color_scale.label, resolved.percent),
        &config.normalizer,
    )
    .with_indicator_label(request.indicator_label.as_deref().unwrap_or("-"));
    if let Some((source, label, percent)) = &secondary {
        tooltip = tooltip.with_secondary(SecondaryMetric {
            source,
            format: ValueFormat::new(label, *percent),
        });
    }

    // 4. Layers
    let points = centroid::project(&geo.features, &join, &config.data_keys.feature_key);
    let ctx = LayerContext {
        geo,
        join: &join,
        feature_key: &config.data_keys.feature_key,
        points: &points,
        color: &color_scale,
        size: size_scale.as_ref(),
        stroke: &stroke,
        style: &config.style,
        tooltip: &tooltip,
    };
    let primary = renderer.primary_layers(&ctx);
    Ok(compiler::compose_scene(&ctx, primary, resolved.title))
}

/// Strategy for the primary layer of a map idiom.
trait Renderer {
    fn size_scale(&self, join: &JoinIndex<'_>) -> Option<SizeScale>;
    fn primary_layers<'g>(&self, ctx: &LayerContext<'g, '_>) -> Vec<SceneLayer<'g>>;
}

/// Regions filled by value.
struct ChoroplethRenderer;
impl Renderer for ChoroplethRenderer {
    fn size_scale(&self, _join: &JoinIndex<'_>) -> Option<SizeScale> {
        None
    }

    fn primary_layers<'g>(&self, ctx: &LayerContext<'g, '_>) -> Vec<SceneLayer<'g>> {
        vec![compiler::compile_regions(ctx)]
    }
}

/// Circles sized by a second value and colored by the metric, over unfilled boundaries.
struct SymbolRenderer<'c> {
    symbols: &'c SymbolConfig,
}
impl Renderer for SymbolRenderer<'_> {
    fn size_scale(&self, join: &JoinIndex<'_>) -> Option<SizeScale> {
        let max = join.max_size().unwrap_or(0.0);
        Some(SizeScale::new(max, self.symbols.radius_range, self.symbols.size_label.as_str()))
    }

    fn primary_layers<'g>(&self, ctx: &LayerContext<'g, '_>) -> Vec<SceneLayer<'g>> {
        let mut layers = vec![compiler::compile_boundaries(ctx)];
        if let Some(size) = ctx.size {
            layers.push(compiler::compile_symbols(ctx, size));
            if self.symbols.labels {
                layers.push(compiler::compile_symbol_labels(ctx, size));
            }
        }
        layers
    }
}

fn filter_rows<'r>(rows: &'r [DataRow], filter: Option<&(String, String)>) -> Cow<'r, [DataRow]> {
    let Some((column, wanted)) = filter else {
        return Cow::Borrowed(rows);
    };
    let kept: Vec<DataRow> = rows
        .iter()
        .filter(|row| row.text(column).is_some_and(|v| v.trim() == wanted.as_str()))
        .cloned()
        .collect();
    debug!(column = %column, indicator = %wanted, kept = kept.len(), total = rows.len(), "filtered rows");
    Cow::Owned(kept)
}

fn metric_label<'s>(label: &'s str, metric: &'s str) -> &'s str {
    if label.is_empty() {
        metric
    } else {
        label
    }
}

/// The metric a dual-metric tooltip shows second: the configured one, else the first other scale.
fn secondary_metric(config: &RenderConfig, metric: &str) -> Option<(ValueSource, String, Option<PercentMode>)> {
    if config.tooltip.template != TooltipTemplate::DualMetric {
        return None;
    }
    let other = match &config.tooltip.secondary_metric {
        Some(name) => name.as_str(),
        None => config
            .scales
            .keys()
            .map(String::as_str)
            .find(|k| *k != metric && *k != "default")?,
    };
    let spec = resolve::scale_spec(config, other).ok()?;
    Some((
        config.value_source(other),
        metric_label(&spec.label, other).to_string(),
        spec.percent,
    ))
}

/// Palette for the resolved scale, sized for the final domain.
fn build_palette(resolved: &ResolvedRender, domain: &[f64], registry: &PaletteRegistry) -> Vec<String> {
    let sampling = match resolved.family {
        DomainFamily::Diverging(params) => {
            if let Some(colors) = explicit_colors(resolved, registry) {
                return colors;
            }
            let (negative, positive) = domain::diverging_counts(domain, params.pivot, params.bins);
            let (min_index, max_index) = resolved.index_window;
            Sampling::Diverging(
                DivergingSampling::symmetric(negative + positive)
                    .with_counts(negative, positive)
                    .with_window(min_index, max_index),
            )
        }
        _ => match resolved.kind {
            ScaleKind::Linear => Sampling::Sequential,
            ScaleKind::Quantize => Sampling::Quantize { count: QUANTIZE_BINS },
            // Custom ramps give their five fixed shades and are reconciled below
            ScaleKind::Threshold if domain.is_empty() => Sampling::Sequential,
            ScaleKind::Threshold => match registry.kind_of(&resolved.scheme) {
                Some(SchemeKind::Ramp) => Sampling::Sequential,
                _ => Sampling::Quantize {
                    count: domain.len() + 1,
                },
            },
        },
    };

    let colors = registry.resolve(&resolved.scheme, sampling).unwrap_or_else(|| {
        let fallback = match resolved.family {
            DomainFamily::Diverging(_) => FALLBACK_DIVERGING,
            _ => FALLBACK_SEQUENTIAL,
        };
        warn!(scheme = %resolved.scheme, fallback, "unknown color scheme, using fallback");
        registry.resolve(fallback, sampling).unwrap_or_else(|| {
            let base: Vec<String> = FALLBACK_COLORS.iter().map(|c| c.to_string()).collect();
            color::resample(&base, sampling_len(sampling, base.len()))
        })
    });

    reconcile(resolved, colors, domain)
}

fn sampling_len(sampling: Sampling, natural: usize) -> usize {
    match sampling {
        Sampling::Sequential => natural,
        Sampling::Quantize { count } => count,
        Sampling::Diverging(params) => params.total(),
    }
}

/// Hand-picked diverging colors, when configured and addressable.
fn explicit_colors(resolved: &ResolvedRender, registry: &PaletteRegistry) -> Option<Vec<String>> {
    let indices = resolved.color_indices.as_ref()?;
    if registry.kind_of(&resolved.scheme) != Some(SchemeKind::DivergingPair) {
        debug!(scheme = %resolved.scheme, "color indices ignored for a scheme that is not a diverging pair");
        return None;
    }
    let colors = registry.resolve_indices(&resolved.scheme, indices);
    if colors.is_none() {
        warn!(scheme = %resolved.scheme, ?indices, "color index out of range, sampling instead");
    }
    colors
}

/// A threshold scale needs exactly one more color than it has thresholds.
fn reconcile(resolved: &ResolvedRender, colors: Vec<String>, domain: &[f64]) -> Vec<String> {
    if resolved.kind != ScaleKind::Threshold || domain.is_empty() || colors.is_empty() {
        return colors;
    }
    let expected = domain.len() + 1;
    if colors.len() == expected {
        return colors;
    }
    warn!(
        scheme = %resolved.scheme,
        colors = colors.len(),
        expected,
        "palette length does not match domain, resampling"
    );
    color::resample(&colors, expected)
}

fn outline_stroke(hint: &OutlineHint, colors: &[String], registry: &PaletteRegistry) -> String {
    let stroke = match hint {
        OutlineHint::Diverging => Some(DIVERGING_OUTLINE),
        OutlineHint::Ramp(name) => registry
            .darkest_shade(name)
            .or_else(|| colors.last().map(String::as_str)),
        OutlineHint::Palette => colors.last().map(String::as_str),
    };
    stroke.unwrap_or(DEFAULT_OUTLINE).to_string()
}
