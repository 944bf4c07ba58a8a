use geo::Geometry;

use crate::domain::DomainFamily;
use crate::join::JoinRules;
use crate::scale::{ColorScale, PercentMode, ScaleKind, SizeScale, TickFormat};

// =============================================================================
// Phase 1: Resolution
// =============================================================================

/// Where the outline color comes from once the palette is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineHint {
    /// Neutral dark gray for diverging scales.
    Diverging,
    /// Darkest shade of a user-selected custom ramp.
    Ramp(String),
    /// Darkest color of the resolved palette.
    Palette,
}

/// A render request checked against the configuration: every decision that
/// does not depend on the data values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRender {
    pub metric: String,
    pub title: String,
    /// Scheme the palette is drawn from, after the user's selection.
    pub scheme: String,
    pub family: DomainFamily,
    pub kind: ScaleKind,
    pub explicit_domain: Option<Vec<f64>>,
    pub color_indices: Option<Vec<usize>>,
    /// Ramp index window for diverging sampling.
    pub index_window: (usize, usize),
    pub outline: OutlineHint,
    pub label: String,
    pub percent: Option<PercentMode>,
    pub clamp: bool,
    pub legend: bool,
    pub tick_format: TickFormat,
    pub join_rules: JoinRules,
    /// `(column, value)` rows must match to take part in the render.
    pub row_filter: Option<(String, String)>,
}

// =============================================================================
// Phase 2: Compilation (Scene Graph)
// =============================================================================

/// Paint order of the layer roles; backends sort by it.
pub mod z_order {
    pub const BACKGROUND: i32 = -100;
    /// Filled regions, or region boundaries under symbols.
    pub const REGIONS: i32 = 0;
    pub const SYMBOLS: i32 = 10;
    pub const SYMBOL_LABELS: i32 = 15;
    pub const OVERLAYS: i32 = 20;
    pub const OUTLINE: i32 = 30;
    /// Always topmost so tooltips win pointer events.
    pub const HIT_TARGETS: i32 = 100;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    Background,
    Regions,
    Symbols,
    SymbolLabels,
    Overlay,
    Outline,
    HitTargets,
}

impl LayerRole {
    pub fn z_index(self) -> i32 {
        match self {
            LayerRole::Background => z_order::BACKGROUND,
            LayerRole::Regions => z_order::REGIONS,
            LayerRole::Symbols => z_order::SYMBOLS,
            LayerRole::SymbolLabels => z_order::SYMBOL_LABELS,
            LayerRole::Overlay => z_order::OVERLAYS,
            LayerRole::Outline => z_order::OUTLINE,
            LayerRole::HitTargets => z_order::HIT_TARGETS,
        }
    }
}

/// Paint attributes of a shape or circle. `None` paints nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkStyle {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
    /// Whether the mark receives pointer events.
    pub interactive: bool,
}

impl MarkStyle {
    pub fn filled(fill: &str) -> Self {
        MarkStyle {
            fill: Some(fill.to_string()),
            stroke: None,
            stroke_width: 0.0,
            stroke_opacity: 1.0,
            interactive: false,
        }
    }

    pub fn stroked(stroke: &str, width: f64) -> Self {
        MarkStyle {
            fill: None,
            stroke: Some(stroke.to_string()),
            stroke_width: width,
            stroke_opacity: 1.0,
            interactive: false,
        }
    }

    /// Invisible mark that only carries a tooltip.
    pub fn hit_target() -> Self {
        MarkStyle {
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            stroke_opacity: 0.0,
            interactive: true,
        }
    }

    pub fn with_stroke(mut self, stroke: &str, width: f64, opacity: f64) -> Self {
        self.stroke = Some(stroke.to_string());
        self.stroke_width = width;
        self.stroke_opacity = opacity;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn is_invisible(&self) -> bool {
        self.fill.is_none() && self.stroke.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: String,
    pub size: f64,
    pub bold: bool,
}

/// A backend-agnostic drawing primitive, in the geometry's coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand<'a> {
    DrawShape {
        geometry: &'a Geometry<f64>,
        style: MarkStyle,
        title: Option<String>,
    },
    DrawCircle {
        center: (f64, f64),
        /// Radius in pixels.
        radius: f64,
        style: MarkStyle,
        title: Option<String>,
    },
    DrawText {
        at: (f64, f64),
        text: String,
        style: TextStyle,
    },
}

impl DrawCommand<'_> {
    pub fn title(&self) -> Option<&str> {
        match self {
            DrawCommand::DrawShape { title, .. } | DrawCommand::DrawCircle { title, .. } => title.as_deref(),
            DrawCommand::DrawText { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayer<'a> {
    pub role: LayerRole,
    pub commands: Vec<DrawCommand<'a>>,
}

impl<'a> SceneLayer<'a> {
    pub fn new(role: LayerRole) -> Self {
        SceneLayer {
            role,
            commands: Vec::new(),
        }
    }
}

/// The ordered layers of one map plus the scale descriptors for legends.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph<'a> {
    pub width: u32,
    pub height: u32,
    pub inset: f64,
    pub title: String,
    /// Layers in paint order, bottom first.
    pub layers: Vec<SceneLayer<'a>>,
    pub color: ColorScale,
    pub size: Option<SizeScale>,
    /// Outline color, also used for title and legend text.
    pub stroke: String,
    pub show_legend: bool,
}

impl<'a> SceneGraph<'a> {
    pub fn layer(&self, role: LayerRole) -> Option<&SceneLayer<'a>> {
        self.layers.iter().find(|l| l.role == role)
    }

    pub fn roles(&self) -> Vec<LayerRole> {
        self.layers.iter().map(|l| l.role).collect()
    }

    /// Every geometry the scene draws, for fitting the frame.
    pub fn geometries(&self) -> impl Iterator<Item = &'a Geometry<f64>> + '_ {
        self.layers.iter().flat_map(|l| l.commands.iter()).filter_map(|c| match c {
            DrawCommand::DrawShape { geometry, .. } => Some(*geometry),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_order_is_increasing_in_paint_order() {
        let order = [
            LayerRole::Background,
            LayerRole::Regions,
            LayerRole::Symbols,
            LayerRole::SymbolLabels,
            LayerRole::Overlay,
            LayerRole::Outline,
            LayerRole::HitTargets,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].z_index() < pair[1].z_index(), "{:?}", pair);
        }
    }

    #[test]
    fn test_mark_styles() {
        assert!(MarkStyle::hit_target().is_invisible());
        assert!(MarkStyle::hit_target().interactive);
        let region = MarkStyle::filled("#fff").with_stroke("#222", 0.375, 0.5);
        assert_eq!(region.stroke.as_deref(), Some("#222"));
        assert!(!region.is_invisible());
        assert!(!MarkStyle::stroked("#000", 1.0).interactive);
    }
}
