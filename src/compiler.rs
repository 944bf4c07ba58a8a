use std::cmp::Ordering;

use tracing::debug;

use crate::centroid::CentroidPoint;
use crate::config::MapStyle;
use crate::geometry::{FeatureKey, GeoData};
use crate::ir::{DrawCommand, LayerRole, MarkStyle, SceneGraph, SceneLayer, TextStyle};
use crate::join::{JoinEntry, JoinIndex};
use crate::scale::{ColorScale, SizeScale};
use crate::tooltip::TooltipBuilder;

/// Region borders are drawn at this fraction of the outline width.
const REGION_STROKE_RATIO: f64 = 0.3;
const REGION_STROKE_OPACITY: f64 = 0.5;
const SYMBOL_STROKE_WIDTH: f64 = 0.5;
const LABEL_SIZE: f64 = 9.0;

/// Resolved inputs shared by every layer of one map.
pub struct LayerContext<'a, 'r> {
    pub geo: &'a GeoData,
    pub join: &'r JoinIndex<'r>,
    pub feature_key: &'r FeatureKey,
    pub points: &'r [CentroidPoint<'r>],
    pub color: &'r ColorScale,
    /// Set for proportional-symbol maps.
    pub size: Option<&'r SizeScale>,
    /// Outline color; also strokes regions, symbols and uncolored overlays.
    pub stroke: &'r str,
    pub style: &'r MapStyle,
    pub tooltip: &'r TooltipBuilder<'r>,
}

/// Assemble the scene: background, the primary layers, overlays, outline, then hit targets.
pub fn compose_scene<'a>(ctx: &LayerContext<'a, '_>, primary: Vec<SceneLayer<'a>>, title: String) -> SceneGraph<'a> {
    let (width, height) = ctx.style.size(ctx.size.is_some());

    let mut layers = Vec::with_capacity(primary.len() + 4);
    layers.extend(compile_background(ctx));
    layers.extend(primary);
    layers.extend(compile_overlays(ctx));
    layers.extend(compile_outline(ctx));
    layers.push(compile_hit_targets(ctx));
    // Stable, so layers sharing a role keep their insertion order
    layers.sort_by_key(|layer| layer.role.z_index());

    debug!(
        layers = layers.len(),
        commands = layers.iter().map(|l| l.commands.len()).sum::<usize>(),
        "composed scene"
    );

    SceneGraph {
        width,
        height,
        inset: ctx.style.inset,
        title,
        layers,
        color: ctx.color.clone(),
        size: ctx.size.cloned(),
        stroke: ctx.stroke.to_string(),
        show_legend: ctx.style.show_legend && ctx.color.legend,
    }
}

fn compile_background<'a>(ctx: &LayerContext<'a, '_>) -> Option<SceneLayer<'a>> {
    let geo: &'a GeoData = ctx.geo;
    let geometry = geo.background.as_ref()?;
    let mut layer = SceneLayer::new(LayerRole::Background);
    layer.commands.push(DrawCommand::DrawShape {
        geometry,
        style: MarkStyle::filled(&ctx.style.background_fill),
        title: None,
    });
    Some(layer)
}

/// Every feature filled by its joined value; misses get the unknown color.
pub fn compile_regions<'a>(ctx: &LayerContext<'a, '_>) -> SceneLayer<'a> {
    let geo: &'a GeoData = ctx.geo;
    let stroke_width = ctx.style.outline_stroke_width * REGION_STROKE_RATIO;
    let mut layer = SceneLayer::new(LayerRole::Regions);
    let mut unknown = 0usize;

    for feature in &geo.features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let value = ctx.join.lookup(feature, ctx.feature_key).and_then(|e| e.value);
        if value.is_none() {
            unknown += 1;
        }
        layer.commands.push(DrawCommand::DrawShape {
            geometry,
            style: MarkStyle::filled(&ctx.color.color(value)).with_stroke(
                ctx.stroke,
                stroke_width,
                REGION_STROKE_OPACITY,
            ),
            title: None,
        });
    }

    debug!(regions = layer.commands.len(), unknown, "compiled regions");
    layer
}

/// Unfilled feature borders drawn under proportional symbols.
pub fn compile_boundaries<'a>(ctx: &LayerContext<'a, '_>) -> SceneLayer<'a> {
    let geo: &'a GeoData = ctx.geo;
    let style = MarkStyle::stroked(ctx.stroke, ctx.style.outline_stroke_width * REGION_STROKE_RATIO);
    let mut layer = SceneLayer::new(LayerRole::Regions);
    layer.commands = geo
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|geometry| DrawCommand::DrawShape {
            geometry,
            style: style.clone(),
            title: None,
        })
        .collect();
    layer
}

/// Points that get a symbol, largest first so small ones stay visible on top.
fn sized_points<'p, 'a>(points: &'p [CentroidPoint<'a>], size: &SizeScale) -> Vec<(&'p CentroidPoint<'a>, f64)> {
    let mut sized: Vec<_> = points
        .iter()
        .filter_map(|p| size.radius(p.size).map(|r| (p, r)))
        .collect();
    sized.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    sized
}

pub fn compile_symbols<'a>(ctx: &LayerContext<'a, '_>, size: &SizeScale) -> SceneLayer<'a> {
    let mut layer = SceneLayer::new(LayerRole::Symbols);
    for (point, radius) in sized_points(ctx.points, size) {
        layer.commands.push(DrawCommand::DrawCircle {
            center: (point.lon, point.lat),
            radius,
            style: MarkStyle::filled(&ctx.color.color(point.value)).with_stroke(ctx.stroke, SYMBOL_STROKE_WIDTH, 1.0),
            title: None,
        });
    }
    layer
}

/// Feature codes written on the symbols, without leading zeros.
pub fn compile_symbol_labels<'a>(ctx: &LayerContext<'a, '_>, size: &SizeScale) -> SceneLayer<'a> {
    let mut layer = SceneLayer::new(LayerRole::SymbolLabels);
    for (point, _) in sized_points(ctx.points, size) {
        let Some(code) = ctx.feature_key.raw_key(point.feature) else {
            continue;
        };
        layer.commands.push(DrawCommand::DrawText {
            at: (point.lon, point.lat),
            text: display_code(&code).to_string(),
            style: TextStyle {
                color: ctx.stroke.to_string(),
                size: LABEL_SIZE,
                bold: true,
            },
        });
    }
    layer
}

fn display_code(code: &str) -> &str {
    let stripped = code.trim_start_matches('0');
    if stripped.is_empty() && !code.is_empty() {
        "0"
    } else {
        stripped
    }
}

fn compile_overlays<'a>(ctx: &LayerContext<'a, '_>) -> Option<SceneLayer<'a>> {
    let geo: &'a GeoData = ctx.geo;
    if geo.overlays.is_empty() {
        return None;
    }
    let mut layer = SceneLayer::new(LayerRole::Overlay);
    for mesh in &geo.overlays {
        let stroke = mesh.stroke.as_deref().unwrap_or(ctx.stroke);
        let width = mesh.stroke_width.unwrap_or(ctx.style.overlay_stroke_width);
        layer.commands.push(DrawCommand::DrawShape {
            geometry: &mesh.geometry,
            style: MarkStyle::stroked(stroke, width),
            title: None,
        });
    }
    Some(layer)
}

fn compile_outline<'a>(ctx: &LayerContext<'a, '_>) -> Option<SceneLayer<'a>> {
    let geo: &'a GeoData = ctx.geo;
    let geometry = geo.outline.as_ref()?;
    let mut layer = SceneLayer::new(LayerRole::Outline);
    layer.commands.push(DrawCommand::DrawShape {
        geometry,
        style: MarkStyle::stroked(ctx.stroke, ctx.style.outline_stroke_width),
        title: None,
    });
    Some(layer)
}

/// Invisible circles at every centroid carrying the tooltip text.
///
/// On symbol maps a target is at least as large as the symbol it covers.
pub fn compile_hit_targets<'a>(ctx: &LayerContext<'a, '_>) -> SceneLayer<'a> {
    let mut layer = SceneLayer::new(LayerRole::HitTargets);
    for point in ctx.points {
        let symbol = ctx.size.and_then(|s| s.radius(point.size)).unwrap_or(0.0);
        let code = ctx.feature_key.raw_key(point.feature).or_else(|| point.key.clone());
        let entry = point.row.map(|row| JoinEntry {
            row,
            value: point.value,
            size: point.size,
        });
        layer.commands.push(DrawCommand::DrawCircle {
            center: (point.lon, point.lat),
            radius: ctx.style.hit_radius.max(symbol),
            style: MarkStyle::hit_target(),
            title: Some(ctx.tooltip.title(point.feature, code.as_deref(), entry.as_ref())),
        });
    }
    layer
}
