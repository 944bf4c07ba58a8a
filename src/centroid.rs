use geo::Centroid;
use tracing::warn;

use crate::geometry::{FeatureKey, GeoFeature};
use crate::join::{DataRow, JoinIndex};

/// Representative point of a feature, in the features' own coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidPoint<'a> {
    pub lon: f64,
    pub lat: f64,
    pub value: Option<f64>,
    pub size: Option<f64>,
    pub feature: &'a GeoFeature,
    pub row: Option<&'a DataRow>,
    pub key: Option<String>,
}

/// Geometric centroid of a feature, `None` for empty or missing geometry.
pub fn feature_centroid(feature: &GeoFeature) -> Option<(f64, f64)> {
    let point = feature.geometry.as_ref()?.centroid()?;
    let (x, y) = (point.x(), point.y());
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

/// One centroid per feature that has a geometry, with its joined row.
pub fn project<'a>(
    features: &'a [GeoFeature],
    join: &JoinIndex<'a>,
    feature_key: &FeatureKey,
) -> Vec<CentroidPoint<'a>> {
    features
        .iter()
        .filter_map(|feature| {
            let Some((lon, lat)) = feature_centroid(feature) else {
                warn!(key = ?feature_key.raw_key(feature), "feature has no centroid, skipped");
                return None;
            };
            let key = feature_key.key(feature);
            let entry = key.as_deref().and_then(|k| join.get(k));
            Some(CentroidPoint {
                lon,
                lat,
                value: entry.and_then(|e| e.value),
                size: entry.and_then(|e| e.size),
                feature,
                row: entry.map(|e| e.row),
                key,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{JoinRules, RowKey, ValueSource};
    use geo::{polygon, Geometry};
    use serde_json::{json, Map, Value};

    fn square(code: &str, x: f64, y: f64) -> GeoFeature {
        let poly = polygon![
            (x: x, y: y),
            (x: x + 2.0, y: y),
            (x: x + 2.0, y: y + 2.0),
            (x: x, y: y + 2.0),
            (x: x, y: y),
        ];
        let mut props = Map::new();
        props.insert("INSEE_DEP".to_string(), json!(code));
        GeoFeature::new(Some(Geometry::Polygon(poly)), props)
    }

    #[test]
    fn test_centroid_of_square() {
        assert_eq!(feature_centroid(&square("01", 0.0, 0.0)), Some((1.0, 1.0)));
    }

    #[test]
    fn test_project_joins_rows() {
        let features = vec![square("01", 0.0, 0.0), square("02", 10.0, 4.0)];
        let rows = vec![DataRow::from_pairs([("DEP", "1"), ("v", "4,5")])];
        let join = JoinIndex::build(
            &rows,
            &JoinRules::new(RowKey::Column("DEP".into()), ValueSource::Column("v".into())),
        );
        let points = project(&features, &join, &FeatureKey::Default);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, Some(4.5));
        assert!(points[0].row.is_some());
        assert_eq!((points[1].lon, points[1].lat), (11.0, 5.0));
        assert_eq!(points[1].value, None);
        assert_eq!(points[1].key.as_deref(), Some("02"));
    }

    #[test]
    fn test_features_without_geometry_are_skipped() {
        let mut props = Map::new();
        props.insert("INSEE_DEP".to_string(), Value::String("03".into()));
        let features = vec![GeoFeature::new(None, props)];
        let join = JoinIndex::default();
        assert!(project(&features, &join, &FeatureKey::Default).is_empty());
    }
}
