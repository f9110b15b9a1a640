//! # Geographic Utilities
//!
//! Distance and extent helpers behind the itinerary pipeline.
//!
//! Cluster centroids, off-trail distances, circularity checks and route
//! lengths all go through this module, so every distance the app shows is
//! computed the same way.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points (m) |
//! | [`distance_km`] | Same, in kilometers |
//! | [`polyline_length`] | Haversine length of a route part (m) |
//! | [`to_line_string`] | Route part as a `geo::LineString` (x = lon, y = lat) |
//! | [`point_to_segment_distance`] | Distance from a point to the closest point of a segment (m) |
//! | [`point_to_polyline_distance`] | Distance from a point to the closest point of a polyline (m) |
//! | [`compute_bounds`] | Lat/lon box around a set of points |
//! | [`compute_center`] | Arithmetic centroid of a set of points |
//!
//! ## Example
//!
//! ```rust
//! use trailfox_core::{GpsPoint, geo_utils};
//!
//! let track = vec![
//!     GpsPoint::new(49.6116, 6.1319),  // Luxembourg
//!     GpsPoint::new(49.6120, 6.1330),
//!     GpsPoint::new(49.6130, 6.1345),
//! ];
//!
//! let length = geo_utils::polyline_length(&track);
//! assert!(length > 100.0 && length < 300.0);
//!
//! // A walker about 30 m off the first leg
//! let walker = GpsPoint::new(49.6121, 6.1324);
//! let off_trail = geo_utils::point_to_polyline_distance(&walker, &track).unwrap();
//! assert!(off_trail < 50.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine metric from `geo`. Closest points on a line
//! are found on the sphere with [`HaversineClosestPoint`], then measured with
//! the same metric, so an off-trail distance never exceeds the distance to
//! either segment endpoint.
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).

use geo::{Closest, Distance, Haversine, HaversineClosestPoint, Line, LineString, Point};

use crate::{Bounds, GpsPoint};

// =============================================================================
// Distance Functions
// =============================================================================

#[inline]
fn to_point(p: &GpsPoint) -> Point<f64> {
    Point::new(p.longitude, p.latitude)
}

/// Great-circle distance between two GPS points using the haversine formula.
///
/// # Arguments
///
/// * `p1` - First GPS point
/// * `p2` - Second GPS point
///
/// # Returns
///
/// Distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use trailfox_core::{GpsPoint, geo_utils};
///
/// let a = GpsPoint::new(0.0, 0.0);
/// let b = GpsPoint::new(0.0, 1.0);
/// let d = geo_utils::haversine_distance(&a, &b);
/// assert!((d - 111_195.0).abs() < 100.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(to_point(p1), to_point(p2))
}

/// Great-circle distance in kilometers.
#[inline]
pub fn distance_km(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    haversine_distance(p1, p2) / 1000.0
}

/// Total length of a polyline in meters. Empty or single-point input is 0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Route part as a `geo` line with longitude as x and latitude as y.
pub fn to_line_string(points: &[GpsPoint]) -> LineString<f64> {
    points.iter().map(|p| (p.longitude, p.latitude)).collect()
}

fn distance_to_closest(p: Point<f64>, closest: Closest<f64>) -> Option<f64> {
    match closest {
        Closest::Intersection(q) | Closest::SinglePoint(q) => Some(Haversine::distance(p, q)),
        Closest::Indeterminate => None,
    }
}

/// Distance from `p` to the closest point of the great-circle segment `a`-`b`.
///
/// # Arguments
///
/// * `p` - Point to measure from
/// * `a`, `b` - Segment endpoints
///
/// # Returns
///
/// Distance in meters. When the perpendicular foot falls outside the segment
/// this is the distance to the nearer endpoint.
pub fn point_to_segment_distance(p: &GpsPoint, a: &GpsPoint, b: &GpsPoint) -> f64 {
    let point = to_point(p);
    let line = Line::new(to_point(a), to_point(b));
    distance_to_closest(point, line.haversine_closest_point(&point)).unwrap_or_else(|| haversine_distance(p, a))
}

/// Distance from `p` to the closest point of a polyline.
///
/// # Arguments
///
/// * `p` - Point to measure from, typically the user's position
/// * `points` - Vertices of one route part
///
/// # Returns
///
/// Distance in meters, or `None` for fewer than two vertices.
///
/// # Example
///
/// ```rust
/// use trailfox_core::{GpsPoint, geo_utils};
///
/// let part = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)];
/// let d = geo_utils::point_to_polyline_distance(&GpsPoint::new(0.1, 0.5), &part).unwrap();
/// assert!((d - 11_120.0).abs() < 50.0);
///
/// assert!(geo_utils::point_to_polyline_distance(&part[0], &part[..1]).is_none());
/// ```
pub fn point_to_polyline_distance(p: &GpsPoint, points: &[GpsPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let point = to_point(p);
    distance_to_closest(point, to_line_string(points).haversine_closest_point(&point))
}

// =============================================================================
// Bounding Box / Center
// =============================================================================

/// Bounding box of a set of points. Empty input yields an inverted box
/// (MAX/MIN) that contains nothing.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let empty = Bounds {
        min_lat: f64::MAX,
        max_lat: f64::MIN,
        min_lng: f64::MAX,
        max_lng: f64::MIN,
    };
    points.iter().fold(empty, |b, p| Bounds {
        min_lat: b.min_lat.min(p.latitude),
        max_lat: b.max_lat.max(p.latitude),
        min_lng: b.min_lng.min(p.longitude),
        max_lng: b.max_lng.max(p.longitude),
    })
}

/// Arithmetic mean of latitudes and longitudes. Returns (0, 0) for empty input.
///
/// Fine for the few hundred meters a cluster spans; not suitable across the
/// antimeridian.
pub fn compute_center(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }

    let (lat_sum, lon_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
    let count = points.len() as f64;

    GpsPoint::new(lat_sum / count, lon_sum / count)
}
