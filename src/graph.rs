use anyhow::{Context, Result};
use geo::{Coord, Geometry, LineString, Rect};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, warn};

use crate::color::{self, Rgb};
use crate::geometry;
use crate::ir::{DrawCommand, MarkStyle, SceneGraph, TextStyle as LabelStyle};
use crate::tooltip::format_grouped;

const TITLE_HEIGHT: f64 = 28.0;
const TITLE_SIZE: f64 = 16.0;
const LEGEND_SWATCH: i32 = 12;
const LEGEND_ROW: i32 = 18;
const LEGEND_TEXT_SIZE: f64 = 11.0;
/// Radius of bare points in the geometry layers.
const POINT_RADIUS: i32 = 2;

/// Draw a scene graph to PNG bytes.
pub fn render_png(scene: &SceneGraph<'_>) -> Result<Vec<u8>> {
    let (width, height) = (scene.width, scene.height);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_scene(&root, scene)?;
        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

/// Draw a scene graph to an SVG document.
pub fn render_svg(scene: &SceneGraph<'_>) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (scene.width, scene.height)).into_drawing_area();
        draw_scene(&root, scene)?;
        root.present().context("Failed to present drawing")?;
    }
    Ok(svg)
}

fn draw_scene<DB>(root: &DrawingArea<DB, Shift>, scene: &SceneGraph<'_>) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    let title_height = if scene.title.is_empty() { 0.0 } else { TITLE_HEIGHT };
    let Some(bounds) = scene_bounds(scene) else {
        warn!("scene has nothing to draw");
        draw_title(root, scene);
        return Ok(());
    };
    let frame = Frame::fit(bounds, scene.width, scene.height, scene.inset, title_height);

    let mut layers: Vec<_> = scene.layers.iter().collect();
    layers.sort_by_key(|layer| layer.role.z_index());

    for layer in layers {
        let mut drawn = 0usize;
        for command in &layer.commands {
            match command {
                DrawCommand::DrawShape { geometry, style, .. } => {
                    if style.is_invisible() {
                        continue;
                    }
                    draw_geometry(root, &frame, geometry, style)?;
                }
                DrawCommand::DrawCircle {
                    center,
                    radius,
                    style,
                    ..
                } => {
                    if style.is_invisible() {
                        continue;
                    }
                    let at = frame.project(center.0, center.1);
                    draw_circle(root, at, radius.round() as i32, style)?;
                }
                DrawCommand::DrawText { at, text, style } => {
                    let at = frame.project(at.0, at.1);
                    if let Err(err) = draw_text(root, at, text, style, HPos::Center) {
                        warn!(%text, error = %err, "could not draw label");
                        continue;
                    }
                }
            }
            drawn += 1;
        }
        debug!(role = ?layer.role, drawn, "drew layer");
    }

    draw_title(root, scene);
    if scene.show_legend {
        draw_legend(root, scene);
    }
    Ok(())
}

/// Equirectangular fit of the scene into the frame, with longitudes shrunk
/// by the cosine of the mean latitude when coordinates look geographic.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    min_x: f64,
    max_y: f64,
    kx: f64,
    scale: f64,
    left: f64,
    top: f64,
}

impl Frame {
    fn fit(bounds: Rect<f64>, width: u32, height: u32, inset: f64, reserved_top: f64) -> Frame {
        let (min, max) = (bounds.min(), bounds.max());
        let geographic = min.x >= -180.0 && max.x <= 180.0 && min.y >= -90.0 && max.y <= 90.0;
        let kx = if geographic {
            ((min.y + max.y) / 2.0).to_radians().cos().max(0.1)
        } else {
            1.0
        };

        let span_x = ((max.x - min.x) * kx).max(f64::EPSILON);
        let span_y = (max.y - min.y).max(f64::EPSILON);
        let avail_w = (width as f64 - 2.0 * inset).max(1.0);
        let avail_h = (height as f64 - 2.0 * inset - reserved_top).max(1.0);
        let scale = (avail_w / span_x).min(avail_h / span_y);

        Frame {
            min_x: min.x,
            max_y: max.y,
            kx,
            scale,
            left: inset + (avail_w - span_x * scale) / 2.0,
            top: reserved_top + inset + (avail_h - span_y * scale) / 2.0,
        }
    }

    fn project(&self, x: f64, y: f64) -> (i32, i32) {
        let px = self.left + (x - self.min_x) * self.kx * self.scale;
        let py = self.top + (self.max_y - y) * self.scale;
        (px.round() as i32, py.round() as i32)
    }

    fn ring(&self, ring: &LineString<f64>) -> Vec<(i32, i32)> {
        ring.coords().map(|c| self.project(c.x, c.y)).collect()
    }
}

fn scene_bounds(scene: &SceneGraph<'_>) -> Option<Rect<f64>> {
    if let Some(rect) = geometry::bounds(scene.geometries()) {
        return Some(rect);
    }
    let centers: Vec<(f64, f64)> = scene
        .layers
        .iter()
        .flat_map(|l| l.commands.iter())
        .filter_map(|c| match c {
            DrawCommand::DrawCircle { center, .. } => Some(*center),
            DrawCommand::DrawText { at, .. } => Some(*at),
            DrawCommand::DrawShape { .. } => None,
        })
        .collect();
    let first = centers.first()?;
    let (min, max) = centers.iter().fold((*first, *first), |(lo, hi), &(x, y)| {
        ((lo.0.min(x), lo.1.min(y)), (hi.0.max(x), hi.1.max(y)))
    });
    Some(Rect::new(Coord { x: min.0, y: min.1 }, Coord { x: max.0, y: max.1 }))
}

fn rgb(color: &str) -> Option<RGBColor> {
    if color::is_transparent(color) {
        return None;
    }
    let Rgb { r, g, b } = Rgb::parse_hex(color)?;
    Some(RGBColor(r, g, b))
}

fn fill_style(style: &MarkStyle) -> Option<ShapeStyle> {
    style.fill.as_deref().and_then(rgb).map(|c| c.filled())
}

fn stroke_style(style: &MarkStyle) -> Option<ShapeStyle> {
    if !(style.stroke_width > 0.0) || !(style.stroke_opacity > 0.0) {
        return None;
    }
    let color = style.stroke.as_deref().and_then(rgb)?;
    Some(ShapeStyle {
        color: color.mix(style.stroke_opacity),
        filled: false,
        stroke_width: (style.stroke_width.round() as u32).max(1),
    })
}

fn draw_geometry<DB>(root: &DrawingArea<DB, Shift>, frame: &Frame, geometry: &Geometry<f64>, style: &MarkStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    match geometry {
        Geometry::Polygon(polygon) => draw_polygon(root, frame, polygon, style),
        Geometry::MultiPolygon(polygons) => polygons.0.iter().try_for_each(|p| draw_polygon(root, frame, p, style)),
        Geometry::Rect(rect) => draw_polygon(root, frame, &rect.to_polygon(), style),
        Geometry::Triangle(triangle) => draw_polygon(root, frame, &triangle.to_polygon(), style),
        Geometry::LineString(line) => draw_path(root, frame, line, style),
        Geometry::MultiLineString(lines) => lines.0.iter().try_for_each(|l| draw_path(root, frame, l, style)),
        Geometry::Line(line) => draw_path(root, frame, &LineString::from(vec![line.start, line.end]), style),
        Geometry::Point(point) => draw_circle(root, frame.project(point.x(), point.y()), POINT_RADIUS, style),
        Geometry::MultiPoint(points) => points
            .0
            .iter()
            .try_for_each(|p| draw_circle(root, frame.project(p.x(), p.y()), POINT_RADIUS, style)),
        Geometry::GeometryCollection(collection) => collection
            .0
            .iter()
            .try_for_each(|g| draw_geometry(root, frame, g, style)),
    }
}

/// Fills the exterior ring, then strokes every ring.
fn draw_polygon<DB>(root: &DrawingArea<DB, Shift>, frame: &Frame, polygon: &geo::Polygon<f64>, style: &MarkStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if let Some(fill) = fill_style(style) {
        root.draw(&Polygon::new(frame.ring(polygon.exterior()), fill))
            .context("Failed to fill polygon")?;
    }
    if let Some(stroke) = stroke_style(style) {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            root.draw(&PathElement::new(frame.ring(ring), stroke))
                .context("Failed to stroke polygon")?;
        }
    }
    Ok(())
}

fn draw_path<DB>(root: &DrawingArea<DB, Shift>, frame: &Frame, line: &LineString<f64>, style: &MarkStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if let Some(stroke) = stroke_style(style) {
        root.draw(&PathElement::new(frame.ring(line), stroke))
            .context("Failed to draw path")?;
    }
    Ok(())
}

fn draw_circle<DB>(root: &DrawingArea<DB, Shift>, at: (i32, i32), radius: i32, style: &MarkStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let radius = radius.max(1);
    if let Some(fill) = fill_style(style) {
        root.draw(&Circle::new(at, radius, fill)).context("Failed to fill circle")?;
    }
    if let Some(stroke) = stroke_style(style) {
        root.draw(&Circle::new(at, radius, stroke)).context("Failed to stroke circle")?;
    }
    Ok(())
}

fn draw_text<DB>(root: &DrawingArea<DB, Shift>, at: (i32, i32), text: &str, style: &LabelStyle, anchor: HPos) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let Some(color) = rgb(&style.color) else {
        return Ok(());
    };
    let weight = if style.bold { FontStyle::Bold } else { FontStyle::Normal };
    let font = FontDesc::new(FontFamily::SansSerif, style.size, weight)
        .color(&color)
        .pos(Pos::new(anchor, VPos::Center));
    root.draw(&Text::new(text.to_string(), at, font))
        .context("Failed to draw text")?;
    Ok(())
}

fn draw_title<DB>(root: &DrawingArea<DB, Shift>, scene: &SceneGraph<'_>)
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if scene.title.is_empty() {
        return;
    }
    let style = LabelStyle {
        color: scene.stroke.clone(),
        size: TITLE_SIZE,
        bold: true,
    };
    let at = ((scene.width / 2) as i32, (scene.inset + TITLE_HEIGHT / 2.0).round() as i32);
    if let Err(err) = draw_text(root, at, &scene.title, &style, HPos::Center) {
        warn!(error = %err, "could not draw title");
    }
}

/// Color swatches in the lower-left corner, the symbol size key in the lower-right.
fn draw_legend<DB>(root: &DrawingArea<DB, Shift>, scene: &SceneGraph<'_>)
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let text = LabelStyle {
        color: scene.stroke.clone(),
        size: LEGEND_TEXT_SIZE,
        bold: false,
    };
    let inset = scene.inset.round() as i32;
    let bottom = scene.height as i32 - inset;

    let entries = scene.color.legend_entries();
    if !entries.is_empty() {
        let x = inset;
        let mut y = bottom - LEGEND_ROW * entries.len() as i32;
        if !scene.color.label.is_empty() {
            let heading = LabelStyle { bold: true, ..text.clone() };
            if let Err(err) = draw_text(root, (x, y - LEGEND_ROW / 2), &scene.color.label, &heading, HPos::Left) {
                warn!(error = %err, "could not draw legend heading");
            }
        }
        for entry in entries {
            if let Some(fill) = rgb(&entry.color) {
                let swatch = Rectangle::new([(x, y), (x + LEGEND_SWATCH, y + LEGEND_SWATCH)], fill.filled());
                if let Err(err) = root.draw(&swatch) {
                    warn!(error = %err, "could not draw legend swatch");
                }
            }
            let at = (x + LEGEND_SWATCH + 6, y + LEGEND_SWATCH / 2);
            if let Err(err) = draw_text(root, at, &entry.label, &text, HPos::Left) {
                warn!(label = %entry.label, error = %err, "could not draw legend label");
            }
            y += LEGEND_ROW;
        }
    }

    if let Some(size) = scene.size.as_ref().filter(|s| s.max > 0.0) {
        let Some(radius) = size.radius(Some(size.max)) else {
            return;
        };
        let radius = radius.round() as i32;
        let center = (scene.width as i32 - inset - radius, bottom - radius - LEGEND_ROW);
        let style = MarkStyle::stroked(&scene.stroke, 1.0);
        if let Err(err) = draw_circle(root, center, radius, &style) {
            warn!(error = %err, "could not draw size key");
        }
        let label = format!("{}: {}", size.label, format_grouped(size.max));
        let at = (center.0, bottom - LEGEND_ROW / 2);
        if let Err(err) = draw_text(root, at, &label, &text, HPos::Center) {
            warn!(error = %err, "could not draw size key label");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    #[test]
    fn test_frame_fits_projected_bounds() {
        let frame = Frame::fit(rect(0.0, 0.0, 1000.0, 500.0), 520, 270, 10.0, 0.0);
        assert_eq!(frame.kx, 1.0);
        assert_eq!(frame.project(0.0, 500.0), (10, 10));
        assert_eq!(frame.project(1000.0, 0.0), (510, 260));
    }

    #[test]
    fn test_frame_centers_and_reserves_title() {
        let frame = Frame::fit(rect(0.0, 0.0, 100.0, 100.0), 300, 228, 0.0, 28.0);
        // 200px square centered horizontally under the title band
        assert_eq!(frame.project(0.0, 100.0), (50, 28));
        assert_eq!(frame.project(100.0, 0.0), (250, 228));
    }

    #[test]
    fn test_geographic_bounds_shrink_longitudes() {
        let frame = Frame::fit(rect(-5.0, 42.0, 8.0, 51.0), 750, 500, 8.0, 0.0);
        let expected = 46.5f64.to_radians().cos();
        assert!((frame.kx - expected).abs() < 1e-12);
    }

    #[test]
    fn test_colors() {
        assert_eq!(rgb("#ff0000"), Some(RGBColor(255, 0, 0)));
        assert_eq!(rgb("none"), None);
        assert_eq!(rgb("nonsense"), None);
        assert!(stroke_style(&MarkStyle::hit_target()).is_none());
        assert!(fill_style(&MarkStyle::stroked("#000", 1.0)).is_none());
        let stroke = stroke_style(&MarkStyle::stroked("#000", 0.3)).unwrap();
        assert_eq!(stroke.stroke_width, 1);
    }
}
