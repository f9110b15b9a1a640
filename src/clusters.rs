//! Amenity clustering for the itinerary timeline.
//!
//! Amenities are grouped into buckets of fixed trail length. Each bucket
//! becomes one timeline entry with a centroid and per-class counts, and the
//! list is framed by synthetic start/end entries taken from route metadata.

use std::collections::HashMap;

use log::{debug, warn};

use crate::geo_utils::compute_center;
use crate::model::{AmenityCluster, OsmElementType, Route, RouteAmenity, PLACE_CLASS};
use crate::GpsPoint;

/// Two clusters closer than this (km) count as the same trail position.
pub const ENDPOINT_EPSILON_KM: f64 = 0.001;

/// Sentinel osm_id of the synthetic start amenity.
pub const START_SENTINEL_OSM_ID: i64 = -1;

/// Sentinel osm_id of the synthetic end amenity.
pub const END_SENTINEL_OSM_ID: i64 = -2;

/// Round to the nearest multiple of `step`, halves rounding up.
fn round_to(value: f64, step: f64) -> f64 {
    (value / step + 0.5).floor() * step
}

/// Group amenities into trail-distance buckets of `bucket_km`.
///
/// The bucket of an amenity is `round(trail_km / bucket_km) * bucket_km`
/// and its key is that value with three decimals. Output is sorted by
/// `trail_km`; empty input gives an empty list.
///
/// # Example
/// ```
/// use trailfox_core::model::{OsmElementType, RouteAmenity};
/// use trailfox_core::clusters::build_amenity_clusters;
///
/// let amenity = RouteAmenity {
///     route_osm_id: 1, osm_type: OsmElementType::Node, osm_id: 10,
///     name: None, class: "water".into(), subclass: None,
///     lon: 6.1, lat: 49.6, distance_from_trail_m: 20.0, trail_km: 1.25, tags: None,
/// };
/// let clusters = build_amenity_clusters(&[amenity], 0.5);
/// assert_eq!(clusters[0].key, "1.500");
/// ```
pub fn build_amenity_clusters(amenities: &[RouteAmenity], bucket_km: f64) -> Vec<AmenityCluster> {
    if !(bucket_km.is_finite() && bucket_km > 0.0) {
        warn!("[Clusters] Refusing to bucket with step {}", bucket_km);
        return Vec::new();
    }

    let mut clusters: Vec<AmenityCluster> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for amenity in amenities {
        let bucket = round_to(amenity.trail_km, bucket_km);
        let key = format!("{:.3}", bucket);

        let idx = *index_by_key.entry(key.clone()).or_insert_with(|| {
            clusters.push(AmenityCluster::new(key, bucket));
            clusters.len() - 1
        });
        clusters[idx].push(amenity.clone());
    }

    for cluster in &mut clusters {
        let positions: Vec<GpsPoint> = cluster.amenities.iter().map(RouteAmenity::position).collect();
        let center = compute_center(&positions);
        cluster.lon = center.longitude;
        cluster.lat = center.latitude;
    }

    clusters.sort_by(|a, b| a.trail_km.total_cmp(&b.trail_km));

    debug!(
        "[Clusters] {} amenities -> {} clusters ({} km buckets)",
        amenities.len(),
        clusters.len(),
        bucket_km
    );

    clusters
}

/// Keep only amenities whose class is in `allowed`. An empty filter keeps all.
pub fn filter_by_classes(amenities: &[RouteAmenity], allowed: &[String]) -> Vec<RouteAmenity> {
    if allowed.is_empty() {
        return amenities.to_vec();
    }
    amenities
        .iter()
        .filter(|a| allowed.iter().any(|c| *c == a.class))
        .cloned()
        .collect()
}

/// Classes present in the raw amenity list, most frequent first.
/// Equal counts keep their order of first appearance.
pub fn get_available_classes(amenities: &[RouteAmenity]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for a in amenities {
        match counts.iter_mut().find(|(class, _)| *class == a.class) {
            Some((_, n)) => *n += 1,
            None => counts.push((a.class.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(class, _)| class).collect()
}

pub fn get_total_amenities(clusters: &[AmenityCluster]) -> usize {
    clusters.iter().map(|c| c.amenities.len()).sum()
}

/// Smallest distance from the trail among a cluster's amenities.
pub fn get_cluster_min_distance_m(cluster: &AmenityCluster) -> Option<f64> {
    cluster
        .amenities
        .iter()
        .map(|a| a.distance_from_trail_m)
        .reduce(f64::min)
}

/// Compact label for a class chip. Unknown classes pass through.
pub fn normalize_amenity_class_label(label: &str) -> &str {
    match label {
        "accom" => "Accommodation",
        "tourism" => "Tourism",
        "other" => "Other",
        "shelter" => "Shelter",
        "food" => "Food",
        "water" => "Water",
        "hygiene" => "Hygiene",
        "resupply" => "Shops",
        "bike" => "Bike",
        "cash" => "Cash",
        "transport" => "Transport",
        "street" => "Street",
        "medical" => "Medical",
        "place" => "Place",
        other => other,
    }
}

fn endpoint_cluster(route: &Route, key: String, osm_id: i64, name: String, trail_km: f64, lon: f64, lat: f64) -> AmenityCluster {
    let mut cluster = AmenityCluster::new(key, trail_km);
    cluster.push(RouteAmenity {
        route_osm_id: route.osm_id,
        osm_type: OsmElementType::Node,
        osm_id,
        name: Some(name),
        class: PLACE_CLASS.to_string(),
        subclass: None,
        lon,
        lat,
        distance_from_trail_m: 0.0,
        trail_km,
        tags: None,
    });
    cluster.lon = lon;
    cluster.lat = lat;
    cluster
}

/// Make sure the timeline starts at km 0 and ends at the route length.
///
/// A synthetic Place cluster named after `tags.from` ("Start") is added at
/// 0 unless a cluster already lies within [`ENDPOINT_EPSILON_KM`] of it.
/// When the route length is known the same is done at the end with
/// `tags.to` ("End"). Endpoint coordinates borrow the first/last cluster's
/// centroid. The result is sorted by `trail_km`.
pub fn add_itinerary_endpoint_clusters(clusters: &[AmenityCluster], route: &Route) -> Vec<AmenityCluster> {
    let mut out: Vec<AmenityCluster> = clusters.to_vec();

    let has_start = out.iter().any(|c| c.trail_km.abs() <= ENDPOINT_EPSILON_KM);
    if !has_start {
        let name = route.tag("from").filter(|s| !s.is_empty()).unwrap_or("Start");
        let (lon, lat) = out.first().map_or((0.0, 0.0), |c| (c.lon, c.lat));
        out.insert(
            0,
            endpoint_cluster(
                route,
                format!("start-{}", route.osm_id),
                START_SENTINEL_OSM_ID,
                name.to_string(),
                0.0,
                lon,
                lat,
            ),
        );
    }

    if let Some(route_km) = route.length_km().filter(|km| *km != 0.0) {
        let has_end = out
            .iter()
            .any(|c| (c.trail_km - route_km).abs() <= ENDPOINT_EPSILON_KM);
        if !has_end {
            let name = route.tag("to").filter(|s| !s.is_empty()).unwrap_or("End");
            let (lon, lat) = out.last().map_or((0.0, 0.0), |c| (c.lon, c.lat));
            out.push(endpoint_cluster(
                route,
                format!("end-{}", route.osm_id),
                END_SENTINEL_OSM_ID,
                name.to_string(),
                route_km,
                lon,
                lat,
            ));
        }
    }

    out.sort_by(|a, b| a.trail_km.total_cmp(&b.trail_km));
    out
}

/// Timeline order: ascending, or reversed when walking the route backwards.
pub fn get_displayed_clusters(clusters: &[AmenityCluster], invert: bool) -> Vec<AmenityCluster> {
    let mut out = clusters.to_vec();
    if invert {
        out.reverse();
    }
    out
}

/// Drop a selection whose cluster no longer exists after a rebuild.
pub fn sanitize_selected_cluster_key(selected_key: Option<&str>, clusters: &[AmenityCluster]) -> Option<String> {
    let key = selected_key.filter(|k| !k.is_empty())?;
    clusters
        .iter()
        .any(|c| c.key == key)
        .then(|| key.to_string())
}
