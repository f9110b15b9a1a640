//! Data model shared by the itinerary pipeline, the API client and FFI.
//!
//! Field names follow the backend's column names so rows deserialize
//! straight from PostgREST responses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::GpsPoint;

/// Amenity class used for settlements and localities.
pub const PLACE_CLASS: &str = "Place";

/// OSM element kind. The API sends single-letter codes, older rows spell
/// the full name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum OsmElementType {
    #[serde(rename = "N", alias = "node")]
    Node,
    #[serde(rename = "W", alias = "way")]
    Way,
    #[serde(rename = "R", alias = "relation")]
    Relation,
}

/// A point of interest near a route, positioned along the trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteAmenity {
    pub route_osm_id: i64,
    pub osm_type: OsmElementType,
    /// Negative ids are synthetic endpoint entries
    pub osm_id: i64,
    pub name: Option<String>,
    pub class: String,
    pub subclass: Option<String>,
    pub lon: f64,
    pub lat: f64,
    /// Perpendicular distance to the trail in meters
    pub distance_from_trail_m: f64,
    /// Position along the trail in kilometers
    pub trail_km: f64,
    pub tags: Option<HashMap<String, String>>,
}

impl RouteAmenity {
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.lat, self.lon)
    }

    /// True for the start/end entries injected by the endpoint injector.
    pub fn is_synthetic(&self) -> bool {
        self.osm_id < 0
    }

    pub fn is_place(&self) -> bool {
        self.class == PLACE_CLASS
    }
}

/// Number of amenities of one class inside a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClassCount {
    pub class: String,
    pub count: u32,
}

/// Live position of the user relative to the trail. All distances in km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct UserItineraryMetrics {
    pub km_on_trail: f64,
    pub distance_off_trail: f64,
    pub distance_to_next: Option<f64>,
    pub distance_to_end: f64,
}

/// A group of amenities sharing a rounded trail position, shown as one
/// timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct AmenityCluster {
    /// Bucket id, unique within one itinerary computation
    pub key: String,
    /// Bucket center in kilometers along the trail
    pub trail_km: f64,
    pub amenities: Vec<RouteAmenity>,
    /// Per-class counts in order of first appearance
    pub counts_by_class: Vec<ClassCount>,
    pub size: u32,
    /// Centroid of member coordinates
    pub lon: f64,
    pub lat: f64,
    /// Offset from the user-chosen start, set by the timeline builder
    pub km_from_start: Option<f64>,
    /// Present only on the synthetic user-location entry
    pub user_metrics: Option<UserItineraryMetrics>,
}

impl AmenityCluster {
    /// Empty cluster at a trail position.
    pub fn new(key: impl Into<String>, trail_km: f64) -> Self {
        Self {
            key: key.into(),
            trail_km,
            amenities: Vec::new(),
            counts_by_class: Vec::new(),
            size: 0,
            lon: 0.0,
            lat: 0.0,
            km_from_start: None,
            user_metrics: None,
        }
    }

    /// Append an amenity and bump its class count. Does not touch the centroid.
    pub fn push(&mut self, amenity: RouteAmenity) {
        match self.counts_by_class.iter_mut().find(|c| c.class == amenity.class) {
            Some(entry) => entry.count += 1,
            None => self.counts_by_class.push(ClassCount {
                class: amenity.class.clone(),
                count: 1,
            }),
        }
        self.amenities.push(amenity);
        self.size = self.amenities.len() as u32;
    }

    pub fn count_for(&self, class: &str) -> u32 {
        self.counts_by_class
            .iter()
            .find(|c| c.class == class)
            .map_or(0, |c| c.count)
    }

    pub fn centroid(&self) -> GpsPoint {
        GpsPoint::new(self.lat, self.lon)
    }

    /// Member amenities ordered by distance from the trail, nearest first.
    pub fn amenities_by_distance(&self) -> Vec<&RouteAmenity> {
        let mut sorted: Vec<&RouteAmenity> = self.amenities.iter().collect();
        sorted.sort_by(|a, b| a.distance_from_trail_m.total_cmp(&b.distance_from_trail_m));
        sorted
    }

    /// Position used for timeline ordering and spacing.
    pub fn timeline_km(&self) -> f64 {
        self.km_from_start.unwrap_or(self.trail_km)
    }
}

/// Route metadata as listed by the discovery screen.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Route {
    pub osm_id: i64,
    pub name: Option<String>,
    /// OSM network code (iwn, nwn, rwn, lwn)
    pub network: Option<String>,
    pub length_m: Option<f64>,
    pub route_type: Option<String>,
    pub symbol: Option<String>,
    /// Geometry quality flag from the route builder, `ok_*` when usable
    pub geom_quality: Option<String>,
    pub merged_geom_type: Option<String>,
    /// Distance from the query point, only set by the distance RPC
    pub distance_m: Option<f64>,
    pub tags: Option<HashMap<String, String>>,
}

impl Route {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    pub fn length_km(&self) -> Option<f64> {
        self.length_m.map(|m| m / 1000.0)
    }
}

/// Label picked for a cluster header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClusterTitle {
    pub title: String,
    /// True when the title comes from a nearby settlement
    pub is_place_header: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amenity_deserializes_backend_row() {
        let json = r#"{
            "route_osm_id": 42,
            "osm_type": "N",
            "osm_id": 1001,
            "name": "Cafe Central",
            "class": "food",
            "subclass": "cafe",
            "lon": 6.13,
            "lat": 49.61,
            "distance_from_trail_m": 85.5,
            "trail_km": 3.2,
            "tags": {"opening_hours": "Mo-Fr 08:00-18:00"}
        }"#;
        let amenity: RouteAmenity = serde_json::from_str(json).unwrap();
        assert_eq!(amenity.osm_type, OsmElementType::Node);
        assert_eq!(amenity.subclass.as_deref(), Some("cafe"));
        assert!(!amenity.is_synthetic());
    }

    #[test]
    fn test_osm_type_accepts_long_names() {
        let t: OsmElementType = serde_json::from_str("\"relation\"").unwrap();
        assert_eq!(t, OsmElementType::Relation);
    }

    #[test]
    fn test_route_missing_optionals() {
        let route: Route = serde_json::from_str(r#"{"osm_id": 7}"#).unwrap();
        assert_eq!(route.osm_id, 7);
        assert!(route.length_km().is_none());
        assert!(route.tag("from").is_none());
    }

    #[test]
    fn test_cluster_push_tracks_counts_in_order() {
        let mut cluster = AmenityCluster::new("1.000", 1.0);
        for class in ["water", "food", "water"] {
            cluster.push(RouteAmenity {
                route_osm_id: 1,
                osm_type: OsmElementType::Node,
                osm_id: 1,
                name: None,
                class: class.to_string(),
                subclass: None,
                lon: 0.0,
                lat: 0.0,
                distance_from_trail_m: 0.0,
                trail_km: 1.0,
                tags: None,
            });
        }
        assert_eq!(cluster.size, 3);
        assert_eq!(cluster.counts_by_class[0].class, "water");
        assert_eq!(cluster.count_for("water"), 2);
        assert_eq!(cluster.count_for("food"), 1);
        assert_eq!(cluster.count_for("bike"), 0);
    }
}
