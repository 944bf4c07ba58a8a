use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, Geometry, GeometryCollection, Rect};
use geojson::GeoJson;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::join::normalize_key;

/// Properties tried, in order, for a feature's display name.
const NAME_FIELDS: [&str; 4] = ["NOM", "nom", "name", "NAME"];

/// A geographic region with its property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: Map<String, Value>,
}

impl GeoFeature {
    pub fn new(geometry: Option<Geometry<f64>>, properties: Map<String, Value>) -> Self {
        GeoFeature {
            geometry,
            properties,
        }
    }

    /// A property as text; numbers are formatted, empty strings and other types are ignored.
    pub fn property_text(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<String> {
        NAME_FIELDS.iter().find_map(|field| self.property_text(field))
    }
}

/// How a feature exposes its join code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    /// Department code (`INSEE_DEP`, `insee_dep`, `code`, `DEP`).
    #[default]
    Default,
    /// Academy code (`code_academie`, `CODE_ACADEMIE`, `code`).
    Academy,
    /// A single named property.
    Property(String),
}

impl FeatureKey {
    const DEFAULT_FIELDS: [&'static str; 4] = ["INSEE_DEP", "insee_dep", "code", "DEP"];
    const ACADEMY_FIELDS: [&'static str; 3] = ["code_academie", "CODE_ACADEMIE", "code"];

    /// The raw code as found in the property bag.
    pub fn raw_key(&self, feature: &GeoFeature) -> Option<String> {
        match self {
            FeatureKey::Default => Self::DEFAULT_FIELDS.iter().find_map(|f| feature.property_text(f)),
            FeatureKey::Academy => Self::ACADEMY_FIELDS.iter().find_map(|f| feature.property_text(f)),
            FeatureKey::Property(name) => feature.property_text(name),
        }
    }

    /// The normalized join key.
    pub fn key(&self, feature: &GeoFeature) -> Option<String> {
        self.raw_key(feature).map(|k| normalize_key(&k))
    }
}

/// A boundary mesh drawn between the primary layer and the outline.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayMesh {
    pub geometry: Geometry<f64>,
    /// Falls back to the outline stroke when unset.
    pub stroke: Option<String>,
    /// Falls back to the style's overlay width when unset.
    pub stroke_width: Option<f64>,
}

impl OverlayMesh {
    pub fn new(geometry: Geometry<f64>) -> Self {
        OverlayMesh {
            geometry,
            stroke: None,
            stroke_width: None,
        }
    }

    pub fn with_stroke(mut self, stroke: &str, width: f64) -> Self {
        self.stroke = Some(stroke.to_string());
        self.stroke_width = Some(width);
        self
    }
}

/// Everything the geometry provider hands to a render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoData {
    pub features: Vec<GeoFeature>,
    pub background: Option<Geometry<f64>>,
    pub overlays: Vec<OverlayMesh>,
    pub outline: Option<Geometry<f64>>,
}

impl GeoData {
    pub fn new(features: Vec<GeoFeature>) -> Self {
        GeoData {
            features,
            ..GeoData::default()
        }
    }

    pub fn with_background(mut self, background: Geometry<f64>) -> Self {
        self.background = Some(background);
        self
    }

    pub fn with_overlay(mut self, overlay: OverlayMesh) -> Self {
        self.overlays.push(overlay);
        self
    }

    pub fn with_outline(mut self, outline: Geometry<f64>) -> Self {
        self.outline = Some(outline);
        self
    }
}

/// Bounding box over a set of geometries, in their own coordinate space.
pub fn bounds<'a, I>(geometries: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    geometries
        .into_iter()
        .filter_map(|g| g.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        })
}

fn convert(geometry: geojson::Geometry) -> Result<Geometry<f64>> {
    Geometry::<f64>::try_from(geometry).context("Unsupported GeoJSON geometry")
}

/// Parse a GeoJSON document into features.
///
/// A bare geometry or a single feature yields one feature; features without
/// geometry are kept so they still appear as "no data".
pub fn features_from_geojson(text: &str) -> Result<Vec<GeoFeature>> {
    let geojson: GeoJson = text.parse().context("Failed to parse GeoJSON")?;
    let raw = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => {
            return Ok(vec![GeoFeature::new(Some(convert(g)?), Map::new())]);
        }
    };

    raw.into_iter()
        .map(|feature| {
            let geometry = feature.geometry.map(convert).transpose()?;
            Ok(GeoFeature::new(geometry, feature.properties.unwrap_or_default()))
        })
        .collect()
}

/// Parse a GeoJSON document into one geometry, collecting multiple features.
pub fn geometry_from_geojson(text: &str) -> Result<Geometry<f64>> {
    let mut geometries: Vec<Geometry<f64>> = features_from_geojson(text)?
        .into_iter()
        .filter_map(|f| f.geometry)
        .collect();
    match geometries.len() {
        0 => Err(anyhow!("GeoJSON document contains no geometry")),
        1 => Ok(geometries.remove(0)),
        _ => Ok(Geometry::GeometryCollection(GeometryCollection::from(geometries))),
    }
}

pub fn load_features(path: &Path) -> Result<Vec<GeoFeature>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read geometry file {}", path.display()))?;
    features_from_geojson(&text).with_context(|| format!("Invalid geometry file {}", path.display()))
}

pub fn load_geometry(path: &Path) -> Result<Geometry<f64>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read geometry file {}", path.display()))?;
    geometry_from_geojson(&text).with_context(|| format!("Invalid geometry file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"INSEE_DEP": "01", "NOM": "Ain"},
             "geometry": {"type": "Polygon", "coordinates": [[[4.0,45.0],[6.0,45.0],[6.0,47.0],[4.0,47.0],[4.0,45.0]]]}},
            {"type": "Feature", "properties": {"code": 75, "nom": "Paris"},
             "geometry": {"type": "Point", "coordinates": [2.35, 48.85]}},
            {"type": "Feature", "properties": {"INSEE_DEP": "2A"}, "geometry": null}
        ]
    }"#;

    fn feature(props: Value) -> GeoFeature {
        let properties = match props {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        GeoFeature::new(None, properties)
    }

    #[test]
    fn test_features_from_geojson() {
        let features = features_from_geojson(SAMPLE).unwrap();
        assert_eq!(features.len(), 3);
        assert!(matches!(features[0].geometry, Some(Geometry::Polygon(_))));
        assert!(features[2].geometry.is_none());
    }

    #[test]
    fn test_default_feature_key_candidates() {
        let features = features_from_geojson(SAMPLE).unwrap();
        let keys: Vec<Option<String>> = features.iter().map(|f| FeatureKey::Default.key(f)).collect();
        assert_eq!(keys, vec![Some("01".into()), Some("75".into()), Some("2A".into())]);
    }

    #[test]
    fn test_academy_and_property_keys() {
        let f = feature(json!({"code_academie": "6", "region": "r11"}));
        assert_eq!(FeatureKey::Academy.key(&f), Some("06".to_string()));
        assert_eq!(FeatureKey::Property("region".into()).key(&f), Some("R11".to_string()));
        assert_eq!(FeatureKey::Default.key(&f), None);
    }

    #[test]
    fn test_feature_name_fallbacks() {
        assert_eq!(feature(json!({"NOM": "Ain", "name": "x"})).name(), Some("Ain".to_string()));
        assert_eq!(feature(json!({"NAME": "Corse"})).name(), Some("Corse".to_string()));
        assert_eq!(feature(json!({"NOM": ""})).name(), None);
    }

    #[test]
    fn test_geometry_from_geojson_collects() {
        let geometry = geometry_from_geojson(SAMPLE).unwrap();
        match geometry {
            Geometry::GeometryCollection(gc) => assert_eq!(gc.0.len(), 2),
            other => panic!("expected a collection, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_geojson_is_an_error() {
        assert!(features_from_geojson("{\"type\": \"Nope\"}").is_err());
        assert!(geometry_from_geojson(r#"{"type":"FeatureCollection","features":[]}"#).is_err());
    }

    #[test]
    fn test_bounds_over_features() {
        let features = features_from_geojson(SAMPLE).unwrap();
        let rect = bounds(features.iter().filter_map(|f| f.geometry.as_ref())).unwrap();
        assert_eq!(rect.min().x, 2.35);
        assert_eq!(rect.max().y, 48.85);
    }

    #[test]
    fn test_feature_key_deserializes() {
        let key: FeatureKey = serde_json::from_str("\"academy\"").unwrap();
        assert_eq!(key, FeatureKey::Academy);
        let key: FeatureKey = serde_json::from_str(r#"{"property": "CODE"}"#).unwrap();
        assert_eq!(key, FeatureKey::Property("CODE".to_string()));
    }
}
