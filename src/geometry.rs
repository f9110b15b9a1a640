//! Route geometry decoded from the API's GeoJSON.
//!
//! The routes endpoint answers `Accept: application/geo+json` with a Feature
//! or a FeatureCollection wrapping a LineString or MultiLineString. Only the
//! first feature of a collection is used.

use geojson::{Feature, GeoJson, Geometry, Value};
use log::debug;
use serde_json::Value as JsonValue;

use crate::error::{ItineraryError, Result};
use crate::geo_utils::{compute_bounds, polyline_length};
use crate::{Bounds, GpsPoint};

/// A route line split into its parts. A LineString has exactly one part.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteGeometry {
    pub parts: Vec<Vec<GpsPoint>>,
    pub is_multi: bool,
    /// Official route length from the feature properties, in meters
    pub length_m: Option<f64>,
    pub name: Option<String>,
}

impl RouteGeometry {
    /// Single-part geometry from points, without properties.
    pub fn from_points(points: Vec<GpsPoint>) -> Self {
        Self {
            parts: vec![points],
            is_multi: false,
            length_m: None,
            name: None,
        }
    }

    pub fn from_geojson_str(s: &str) -> Result<Self> {
        let geojson: GeoJson = s.parse()?;
        Self::from_geojson(geojson)
    }

    pub fn from_json_value(value: JsonValue) -> Result<Self> {
        let geojson = GeoJson::from_json_value(value)?;
        Self::from_geojson(geojson)
    }

    pub fn from_geojson(geojson: GeoJson) -> Result<Self> {
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                let feature = fc.features.into_iter().next().ok_or_else(|| {
                    ItineraryError::InvalidGeometry("empty FeatureCollection".to_string())
                })?;
                Self::from_feature(feature)
            }
            GeoJson::Feature(feature) => Self::from_feature(feature),
            GeoJson::Geometry(geometry) => Self::from_geometry(&geometry, None, None),
        }
    }

    fn from_feature(feature: Feature) -> Result<Self> {
        let props = feature.properties.as_ref();
        let length_m = props.and_then(|p| p.get("length_m")).and_then(json_number);
        let name = props
            .and_then(|p| p.get("name"))
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let geometry = feature.geometry.as_ref().ok_or(ItineraryError::MissingGeometry)?;
        Self::from_geometry(geometry, length_m, name)
    }

    fn from_geometry(geometry: &Geometry, length_m: Option<f64>, name: Option<String>) -> Result<Self> {
        let (parts, is_multi) = match &geometry.value {
            Value::LineString(coords) => (vec![convert_positions(coords)?], false),
            Value::MultiLineString(lines) => (
                lines
                    .iter()
                    .map(|l| convert_positions(l))
                    .collect::<Result<Vec<_>>>()?,
                true,
            ),
            other => {
                return Err(ItineraryError::InvalidGeometry(format!(
                    "expected LineString or MultiLineString, got {}",
                    value_type_name(other)
                )))
            }
        };

        if parts.iter().all(|p| p.is_empty()) {
            return Err(ItineraryError::InvalidGeometry("no coordinates".to_string()));
        }

        debug!(
            "[Geometry] {} part(s), {} vertices, length_m={:?}",
            parts.len(),
            parts.iter().map(Vec::len).sum::<usize>(),
            length_m
        );

        Ok(Self { parts, is_multi, length_m, name })
    }

    /// All vertices in order, parts concatenated.
    pub fn points(&self) -> impl Iterator<Item = &GpsPoint> {
        self.parts.iter().flatten()
    }

    /// Consecutive vertex pairs inside each part. Gaps between parts are not
    /// bridged.
    pub fn segments(&self) -> impl Iterator<Item = (&GpsPoint, &GpsPoint)> {
        self.parts
            .iter()
            .flat_map(|part| part.windows(2).map(|w| (&w[0], &w[1])))
    }

    pub fn first_point(&self) -> Option<&GpsPoint> {
        self.parts.first()?.first()
    }

    pub fn last_point(&self) -> Option<&GpsPoint> {
        self.parts.last()?.last()
    }

    /// Haversine length of all parts, in meters.
    pub fn geodesic_length_m(&self) -> f64 {
        self.parts.iter().map(|p| polyline_length(p)).sum()
    }

    /// Official length in km, falling back to the measured length.
    pub fn total_length_km(&self) -> f64 {
        match self.length_m {
            Some(m) if m.is_finite() && m > 0.0 => m / 1000.0,
            _ => self.geodesic_length_m() / 1000.0,
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let points: Vec<GpsPoint> = self.points().copied().collect();
        if points.is_empty() {
            return None;
        }
        Some(compute_bounds(&points))
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn json_number(v: &JsonValue) -> Option<f64> {
    match v {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn convert_positions(positions: &[Vec<f64>]) -> Result<Vec<GpsPoint>> {
    positions
        .iter()
        .map(|pos| match pos.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Ok(GpsPoint::new(*lat, *lon)),
            _ => Err(ItineraryError::InvalidGeometry(format!("bad position {:?}", pos))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_feature_with_length() {
        let json = r#"{
            "type": "Feature",
            "properties": {"name": "Mullerthal Trail", "length_m": 37000},
            "geometry": {"type": "LineString", "coordinates": [[6.0, 49.0], [6.1, 49.1]]}
        }"#;
        let geom = RouteGeometry::from_geojson_str(json).unwrap();
        assert!(!geom.is_multi);
        assert_eq!(geom.parts.len(), 1);
        assert_eq!(geom.length_m, Some(37000.0));
        assert_eq!(geom.name.as_deref(), Some("Mullerthal Trail"));
        assert_eq!(geom.total_length_km(), 37.0);
        assert_eq!(geom.first_point(), Some(&GpsPoint::new(49.0, 6.0)));
    }

    #[test]
    fn test_parses_feature_collection_multilinestring() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"length_m": "1500.5"},
                "geometry": {"type": "MultiLineString", "coordinates": [
                    [[0.0, 0.0], [0.01, 0.0]],
                    [[0.02, 0.0], [0.03, 0.0]]
                ]}
            }]
        }"#;
        let geom = RouteGeometry::from_geojson_str(json).unwrap();
        assert!(geom.is_multi);
        assert_eq!(geom.parts.len(), 2);
        assert_eq!(geom.length_m, Some(1500.5));
        assert_eq!(geom.segments().count(), 2);
        assert_eq!(geom.last_point(), Some(&GpsPoint::new(0.0, 0.03)));
    }

    #[test]
    fn test_bare_geometry_falls_back_to_measured_length() {
        let json = r#"{"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 0.0]]}"#;
        let geom = RouteGeometry::from_geojson_str(json).unwrap();
        assert!(geom.length_m.is_none());
        assert!((geom.total_length_km() - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_rejects_non_line_geometry() {
        let json = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        assert!(matches!(
            RouteGeometry::from_geojson_str(json),
            Err(ItineraryError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_rejects_empty_collection_and_missing_geometry() {
        let empty = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(RouteGeometry::from_geojson_str(empty).is_err());

        let no_geom = r#"{"type": "Feature", "properties": {}, "geometry": null}"#;
        assert!(matches!(
            RouteGeometry::from_geojson_str(no_geom),
            Err(ItineraryError::MissingGeometry)
        ));
    }

    #[test]
    fn test_bounds() {
        let geom = RouteGeometry::from_points(vec![
            GpsPoint::new(49.5, 6.0),
            GpsPoint::new(49.9, 6.4),
        ]);
        let b = geom.bounds().unwrap();
        assert_eq!((b.min_lat, b.max_lat, b.min_lng, b.max_lng), (49.5, 49.9, 6.0, 6.4));
    }
}
