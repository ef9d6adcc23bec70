//! GeoJSON decoding into native-coordinate features.

use crate::core::geo::{to_native, Coordinate};
use crate::layers::feature::{Feature, FeatureId};
use crate::{MapError, Result};
use geo_types::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use serde::{Deserialize, Serialize};

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
}

fn point(c: &[f64; 2]) -> Point<f64> {
    let native = to_native(Coordinate::new(c[0], c[1]));
    Point::new(native.x, native.y)
}

fn line(coords: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(coords.iter().map(point).collect::<Vec<_>>())
}

fn polygon(rings: &[Vec<[f64; 2]>]) -> Polygon<f64> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

impl GeoJsonGeometry {
    /// Converts lon/lat geometry to native coordinates.
    pub fn to_native(&self) -> Geometry<f64> {
        match self {
            GeoJsonGeometry::Point { coordinates } => Geometry::Point(point(coordinates)),
            GeoJsonGeometry::LineString { coordinates } => Geometry::LineString(line(coordinates)),
            GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)),
            GeoJsonGeometry::MultiPoint { coordinates } => {
                Geometry::MultiPoint(MultiPoint::new(coordinates.iter().map(point).collect()))
            }
            GeoJsonGeometry::MultiLineString { coordinates } => Geometry::MultiLineString(
                MultiLineString::new(coordinates.iter().map(|l| line(l)).collect()),
            ),
            GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(
                MultiPolygon::new(coordinates.iter().map(|p| polygon(p)).collect()),
            ),
            GeoJsonGeometry::GeometryCollection { geometries } => Geometry::GeometryCollection(
                GeometryCollection::new_from(geometries.iter().map(|g| g.to_native()).collect()),
            ),
        }
    }
}

impl GeoJsonFeature {
    /// Feature identifier: string ids verbatim, numeric ids joined to `prefix`.
    pub fn feature_id(&self, prefix: Option<&str>) -> Option<FeatureId> {
        let id = self
            .id
            .as_ref()
            .or_else(|| self.properties.as_ref().and_then(|p| p.get("id")))?;
        match (id, prefix) {
            (serde_json::Value::String(s), _) => Some(FeatureId::new(s.as_str())),
            (serde_json::Value::Number(n), Some(prefix)) => {
                Some(FeatureId::new(format!("{}.{}", prefix, n)))
            }
            (serde_json::Value::Number(n), None) => Some(FeatureId::new(n.to_string())),
            _ => None,
        }
    }
}

/// Parses a GeoJSON document into features in native coordinates.
///
/// Features without an id or geometry cannot be addressed or drawn and are
/// skipped.
pub fn decode_features(json: &str, id_prefix: Option<&str>) -> Result<Vec<Feature>> {
    let data: GeoJson = serde_json::from_str(json)
        .map_err(|e| MapError::Parse(format!("invalid GeoJSON: {}", e)))?;
    let raw = match data {
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::FeatureCollection { features } => features,
    };

    let mut features = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for item in raw {
        let (Some(id), Some(geometry)) = (item.feature_id(id_prefix), item.geometry.as_ref()) else {
            skipped += 1;
            continue;
        };
        let mut feature = Feature::new(id, geometry.to_native());
        if let Some(properties) = item.properties {
            feature.properties = properties;
        }
        features.push(feature);
    }
    if skipped > 0 {
        log::warn!("skipped {} GeoJSON features without id or geometry", skipped);
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOPS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "stop.4",
                "geometry": { "type": "Point", "coordinates": [-122.68, 45.51] },
                "properties": { "name": "SW 5th & Oak" }
            },
            {
                "type": "Feature",
                "id": 7,
                "geometry": { "type": "Point", "coordinates": [-122.66, 45.52] },
                "properties": {}
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [0, 0] },
                "properties": null
            }
        ]
    }"#;

    #[test]
    fn test_decode_stops() {
        let features = decode_features(STOPS, Some("stop")).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id.as_str(), "stop.4");
        assert_eq!(features[1].id.as_str(), "stop.7");
        assert_eq!(
            features[0].property("name"),
            Some(&serde_json::json!("SW 5th & Oak"))
        );

        let anchor = features[0].anchor().unwrap();
        let expected = to_native(Coordinate::new(-122.68, 45.51));
        assert!((anchor.x - expected.x).abs() < 1e-6);
        assert!((anchor.y - expected.y).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_rings() {
        let json = r#"{
            "type": "Feature",
            "id": "area",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]
            }
        }"#;
        let features = decode_features(json, None).unwrap();
        assert!(matches!(features[0].geometry, Geometry::Polygon(_)));
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            decode_features("{\"type\": \"Nope\"}", None),
            Err(MapError::Parse(_))
        ));
    }
}
