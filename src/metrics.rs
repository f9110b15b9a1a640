//! Live user position relative to the trail.
//!
//! ## Projection
//!
//! The user's position is located on the route in two steps:
//!
//! 1. Find the nearest point on the polyline treating lon/lat as planar
//!    coordinates (`geo`'s `ClosestPoint` and `LineLocatePoint` per part),
//!    and express it as a fraction of the total planar length.
//! 2. Multiply that fraction by the official route length (`length_m` from
//!    the feature properties, or the haversine length when absent).
//!
//! This matches how the backend's line-locate function positions amenities,
//! so `km_on_trail` and amenity `trail_km` values are directly comparable.
//! Off-trail distance is a real geodesic distance.

use geo::{Closest, ClosestPoint, LineLocatePoint, LineString, Point};
use log::debug;

use crate::geo_utils::{distance_km, point_to_polyline_distance, to_line_string};
use crate::geometry::RouteGeometry;
use crate::model::{AmenityCluster, UserItineraryMetrics};
use crate::GpsPoint;

/// Routes whose endpoints are at most this far apart (km) are loops.
pub const CIRCULAR_THRESHOLD_KM: f64 = 0.2;

/// Planar nearest-point location along the geometry.
struct PlanarLocation {
    /// Planar arc length from the start to the projected point
    arc: f64,
    /// Total planar length of all parts
    total: f64,
}

/// Planar length of a part in degrees, lon/lat taken as x/y.
fn planar_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|l| l.dx().hypot(l.dy())).sum()
}

// TODO: verify this planar lon/lat projection against the backend's
// line-locate results on long and curvy routes before changing it.
fn locate_planar(user: &GpsPoint, geometry: &RouteGeometry) -> Option<PlanarLocation> {
    let point = Point::new(user.longitude, user.latitude);

    let mut best: Option<(f64, f64)> = None;
    let mut cumulative = 0.0;

    for part in geometry.parts.iter().filter(|p| p.len() >= 2) {
        let line = to_line_string(part);
        let length = planar_length(&line);

        let nearest = match line.closest_point(&point) {
            Closest::Intersection(q) | Closest::SinglePoint(q) => Some(q),
            Closest::Indeterminate => None,
        };

        if let Some(q) = nearest {
            let offset = (q.x() - point.x()).hypot(q.y() - point.y());
            let fraction = if length > 0.0 {
                line.line_locate_point(&point).unwrap_or(0.0)
            } else {
                0.0
            };
            if best.map_or(true, |(d, _)| offset < d) {
                best = Some((offset, cumulative + fraction * length));
            }
        }
        cumulative += length;
    }

    let (offset, arc) = best?;
    if !offset.is_finite() || !(cumulative > 0.0) {
        return None;
    }

    Some(PlanarLocation { arc, total: cumulative })
}

/// Metrics for the user's position on a route, or `None` when the geometry
/// cannot support them. Callers should hide the live-position panel on `None`.
///
/// `next_cluster` is the first timeline entry ahead of the user.
///
/// # Example
/// ```
/// use trailfox_core::{GpsPoint, geometry::RouteGeometry, metrics::calculate_user_metrics};
///
/// let line = RouteGeometry::from_points(vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)]);
/// let m = calculate_user_metrics(&GpsPoint::new(0.1, 0.5), &line, None).unwrap();
/// assert!(m.km_on_trail > 50.0 && m.km_on_trail < 60.0);
/// assert!(m.distance_off_trail > 10.0 && m.distance_off_trail < 12.0);
/// ```
pub fn calculate_user_metrics(
    user: &GpsPoint,
    geometry: &RouteGeometry,
    next_cluster: Option<&AmenityCluster>,
) -> Option<UserItineraryMetrics> {
    if !user.is_valid() {
        debug!("[Metrics] Invalid user location {:?}", user);
        return None;
    }

    let Some(location) = locate_planar(user, geometry) else {
        debug!("[Metrics] Geometry has no usable segments");
        return None;
    };

    let total_km = geometry.total_length_km();
    if !total_km.is_finite() {
        return None;
    }

    let km_on_trail = (location.arc / location.total) * total_km;

    let distance_off_trail = geometry
        .parts
        .iter()
        .filter_map(|part| point_to_polyline_distance(user, part))
        .reduce(f64::min)?
        / 1000.0;

    let distance_to_end = (total_km - km_on_trail).max(0.0);
    let distance_to_next = next_cluster.map(|c| (c.trail_km - km_on_trail).max(0.0));

    Some(UserItineraryMetrics {
        km_on_trail,
        distance_off_trail,
        distance_to_next,
        distance_to_end,
    })
}

/// Same as [`calculate_user_metrics`] but straight from a GeoJSON string.
/// Unparseable GeoJSON yields `None`.
pub fn calculate_user_metrics_from_geojson(
    user: &GpsPoint,
    geojson: &str,
    next_cluster: Option<&AmenityCluster>,
) -> Option<UserItineraryMetrics> {
    match RouteGeometry::from_geojson_str(geojson) {
        Ok(geometry) => calculate_user_metrics(user, &geometry, next_cluster),
        Err(e) => {
            debug!("[Metrics] Metrics unavailable: {}", e);
            None
        }
    }
}

/// True when the first and last vertices are within 200 m.
pub fn is_route_circular(geometry: &RouteGeometry) -> bool {
    match (geometry.first_point(), geometry.last_point()) {
        (Some(first), Some(last)) => distance_km(first, last) <= CIRCULAR_THRESHOLD_KM,
        _ => false,
    }
}

/// Distance of `current_km` from a custom start point. On loops a negative
/// offset wraps around the route length; otherwise it stays negative.
pub fn calculate_km_from_start(current_km: f64, start_km: f64, total_length: f64, is_circular: bool) -> f64 {
    let diff = current_km - start_km;
    if is_circular && diff < 0.0 {
        diff + total_length
    } else {
        diff
    }
}

/// Great-circle distance in km between two lat/lon pairs.
pub fn get_distance_in_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    distance_km(&GpsPoint::new(lat1, lon1), &GpsPoint::new(lat2, lon2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equator_line() -> RouteGeometry {
        RouteGeometry::from_points(vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)])
    }

    #[test]
    fn test_km_on_trail_is_along_not_across() {
        let metrics = calculate_user_metrics(&GpsPoint::new(0.1, 0.5), &equator_line(), None).unwrap();
        assert!(metrics.km_on_trail > 50.0 && metrics.km_on_trail < 60.0, "{:?}", metrics);
        assert!(metrics.distance_off_trail > 10.0 && metrics.distance_off_trail < 12.0, "{:?}", metrics);
        assert!(metrics.distance_to_next.is_none());
        assert!((metrics.distance_to_end - (111.19 - metrics.km_on_trail)).abs() < 0.1);
    }

    #[test]
    fn test_near_start_and_end() {
        let line = equator_line();
        let start = calculate_user_metrics(&GpsPoint::new(0.001, 0.001), &line, None).unwrap();
        assert!(start.km_on_trail < 1.0);

        let end = calculate_user_metrics(&GpsPoint::new(0.001, 0.999), &line, None).unwrap();
        assert!(end.km_on_trail > 110.0);
    }

    #[test]
    fn test_scales_by_official_length() {
        let mut line = equator_line();
        line.length_m = Some(120_000.0);
        let metrics = calculate_user_metrics(&GpsPoint::new(0.0, 0.25), &line, None).unwrap();
        assert!((metrics.km_on_trail - 30.0).abs() < 1e-6);
        assert!((metrics.distance_to_end - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_to_next_clamps_at_zero() {
        let line = equator_line();
        let ahead = AmenityCluster::new("80.000", 80.0);
        let behind = AmenityCluster::new("10.000", 10.0);
        let user = GpsPoint::new(0.0, 0.5);

        let m = calculate_user_metrics(&user, &line, Some(&ahead)).unwrap();
        let expected = 80.0 - m.km_on_trail;
        assert!((m.distance_to_next.unwrap() - expected).abs() < 1e-9);

        let m = calculate_user_metrics(&user, &line, Some(&behind)).unwrap();
        assert_eq!(m.distance_to_next, Some(0.0));
    }

    #[test]
    fn test_multilinestring_accumulates_across_parts() {
        let geom = RouteGeometry {
            parts: vec![
                vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)],
                vec![GpsPoint::new(0.0, 2.0), GpsPoint::new(0.0, 3.0)],
            ],
            is_multi: true,
            length_m: Some(200_000.0),
            name: None,
        };
        // Halfway along the second part: 1.5 of 2.0 planar units
        let m = calculate_user_metrics(&GpsPoint::new(0.0, 2.5), &geom, None).unwrap();
        assert!((m.km_on_trail - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_corner_of_single_part() {
        // East along the equator, then north along lon 1
        let mut geom = RouteGeometry::from_points(vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(1.0, 1.0),
        ]);
        geom.length_m = Some(200_000.0);

        let m = calculate_user_metrics(&GpsPoint::new(0.5, 1.0), &geom, None).unwrap();
        assert!((m.km_on_trail - 150.0).abs() < 1e-6);
        assert!(m.distance_off_trail < 1e-3);

        // Off to the east of the northern leg
        let m = calculate_user_metrics(&GpsPoint::new(0.25, 1.1), &geom, None).unwrap();
        assert!((m.km_on_trail - 125.0).abs() < 1e-6);
        assert!(m.distance_off_trail > 10.0 && m.distance_off_trail < 11.5, "{:?}", m);
    }

    #[test]
    fn test_degenerate_geometry_yields_none() {
        let single = RouteGeometry::from_points(vec![GpsPoint::new(0.0, 0.0)]);
        assert!(calculate_user_metrics(&GpsPoint::new(0.0, 0.0), &single, None).is_none());

        let zero_length = RouteGeometry::from_points(vec![GpsPoint::new(1.0, 1.0), GpsPoint::new(1.0, 1.0)]);
        assert!(calculate_user_metrics(&GpsPoint::new(0.0, 0.0), &zero_length, None).is_none());

        assert!(calculate_user_metrics(&GpsPoint::new(f64::NAN, 0.0), &equator_line(), None).is_none());
    }

    #[test]
    fn test_from_geojson_malformed() {
        let user = GpsPoint::new(0.0, 0.0);
        assert!(calculate_user_metrics_from_geojson(&user, "not json", None).is_none());
        assert!(calculate_user_metrics_from_geojson(&user, r#"{"type":"Point","coordinates":[0,0]}"#, None).is_none());

        let ok = r#"{"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[1,0]]}}"#;
        assert!(calculate_user_metrics_from_geojson(&user, ok, None).is_some());
    }

    #[test]
    fn test_is_route_circular() {
        let circular = RouteGeometry::from_points(vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(1.0, 1.0),
            GpsPoint::new(0.0, 0.0),
        ]);
        assert!(is_route_circular(&circular));

        assert!(!is_route_circular(&equator_line()));

        let pseudo = RouteGeometry::from_points(vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(0.001, 0.001),
        ]);
        assert!(is_route_circular(&pseudo));
    }

    #[test]
    fn test_is_route_circular_multilinestring() {
        let geom = RouteGeometry {
            parts: vec![
                vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 0.5)],
                vec![GpsPoint::new(0.0, 0.5), GpsPoint::new(0.0005, 0.0005)],
            ],
            is_multi: true,
            length_m: None,
            name: None,
        };
        assert!(is_route_circular(&geom));
        assert!(!is_route_circular(&RouteGeometry { parts: vec![], ..geom }));
    }

    #[test]
    fn test_km_from_start() {
        assert_eq!(calculate_km_from_start(5.0, 2.0, 10.0, false), 3.0);
        assert_eq!(calculate_km_from_start(1.0, 2.0, 10.0, false), -1.0);
        assert_eq!(calculate_km_from_start(1.0, 2.0, 10.0, true), 9.0);
    }

    #[test]
    fn test_get_distance_in_km() {
        assert!((get_distance_in_km(0.0, 0.0, 0.0, 1.0) - 111.19).abs() < 0.05);
    }
}
