//! Live position metrics on GeoJSON input.

use trailfox_core::metrics::{calculate_user_metrics_from_geojson, get_distance_in_km};
use trailfox_core::{calculate_km_from_start, is_route_circular, AmenityCluster, GpsPoint, RouteGeometry};

fn feature(geometry: &str, length_m: Option<f64>) -> String {
    let props = match length_m {
        Some(m) => format!(r#"{{"length_m": {}}}"#, m),
        None => "{}".to_string(),
    };
    format!(r#"{{"type": "Feature", "properties": {}, "geometry": {}}}"#, props, geometry)
}

const EQUATOR: &str = r#"{"type": "LineString", "coordinates": [[0, 0], [1, 0]]}"#;

#[test]
fn test_position_along_equator() {
    let geojson = feature(EQUATOR, None);
    let m = calculate_user_metrics_from_geojson(&GpsPoint::new(0.1, 0.5), &geojson, None).unwrap();
    assert!(m.km_on_trail >= 50.0 && m.km_on_trail <= 60.0, "{:?}", m);
    assert!(m.distance_off_trail >= 10.0 && m.distance_off_trail <= 12.0, "{:?}", m);
}

#[test]
fn test_position_at_the_ends() {
    let geojson = feature(EQUATOR, None);
    let start = calculate_user_metrics_from_geojson(&GpsPoint::new(0.001, 0.001), &geojson, None).unwrap();
    assert!(start.km_on_trail < 1.0);

    let end = calculate_user_metrics_from_geojson(&GpsPoint::new(0.001, 0.999), &geojson, None).unwrap();
    assert!(end.km_on_trail > 110.0);
    assert!(end.distance_to_end < 1.0);
}

#[test]
fn test_official_length_rescales_position() {
    // The server measured 200 km for a line the sphere says is ~111 km
    let geojson = feature(EQUATOR, Some(200_000.0));
    let m = calculate_user_metrics_from_geojson(&GpsPoint::new(0.0, 0.5), &geojson, None).unwrap();
    assert!((m.km_on_trail - 100.0).abs() < 1e-6);
}

#[test]
fn test_distance_to_next_cluster() {
    let geojson = feature(EQUATOR, Some(100_000.0));
    let next = AmenityCluster::new("60.000", 60.0);
    let m = calculate_user_metrics_from_geojson(&GpsPoint::new(0.0, 0.25), &geojson, Some(&next)).unwrap();
    assert!((m.distance_to_next.unwrap() - 35.0).abs() < 1e-6);
}

#[test]
fn test_multilinestring_input() {
    let multi = r#"{"type": "MultiLineString", "coordinates": [[[0, 0], [0.5, 0]], [[0.5, 0], [1, 0]]]}"#;
    let geojson = feature(multi, Some(100_000.0));
    let m = calculate_user_metrics_from_geojson(&GpsPoint::new(0.0, 0.75), &geojson, None).unwrap();
    assert!((m.km_on_trail - 75.0).abs() < 1e-6);
}

#[test]
fn test_unusable_geojson_gives_none() {
    let user = GpsPoint::new(0.0, 0.0);
    assert!(calculate_user_metrics_from_geojson(&user, "", None).is_none());
    assert!(calculate_user_metrics_from_geojson(&user, r#"{"type": "FeatureCollection", "features": []}"#, None).is_none());

    let single_vertex = feature(r#"{"type": "LineString", "coordinates": [[0, 0]]}"#, None);
    assert!(calculate_user_metrics_from_geojson(&user, &single_vertex, None).is_none());
}

#[test]
fn test_circularity_from_geojson() {
    let parse = |coords: &str| {
        RouteGeometry::from_geojson_str(&feature(&format!(r#"{{"type": "LineString", "coordinates": {}}}"#, coords), None))
            .unwrap()
    };
    assert!(is_route_circular(&parse("[[0, 0], [1, 0], [1, 1], [0, 0]]")));
    assert!(!is_route_circular(&parse("[[0, 0], [1, 0]]")));
    assert!(is_route_circular(&parse("[[0, 0], [1, 0], [1, 1], [0.001, 0.001]]")));
}

#[test]
fn test_km_from_start_wraps_only_on_loops() {
    assert_eq!(calculate_km_from_start(1.0, 2.0, 10.0, true), 9.0);
    assert_eq!(calculate_km_from_start(1.0, 2.0, 10.0, false), -1.0);
    assert_eq!(calculate_km_from_start(5.0, 2.0, 10.0, true), 3.0);
}

#[test]
fn test_distance_helper() {
    let d = get_distance_in_km(49.61, 6.13, 48.13, 11.58);
    assert!(d > 400.0 && d < 450.0);
}
