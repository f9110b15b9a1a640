//! Header labels for timeline clusters.
//!
//! Settlement names beat generic POI names, which beat the class fallback.

use crate::model::{AmenityCluster, ClassCount, ClusterTitle};

/// Place amenities farther than this from the trail never name a cluster.
pub const PLACE_HEADER_MAX_DISTANCE_M: f64 = 1000.0;

/// Uppercase the first character.
pub fn titleize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.is_empty())
}

/// Most frequent class; ties go to the class seen first.
pub fn pick_cluster_title(counts_by_class: &[ClassCount]) -> String {
    let mut top: Option<&ClassCount> = None;
    for entry in counts_by_class {
        if top.map_or(true, |t| entry.count > t.count) {
            top = Some(entry);
        }
    }
    top.map_or_else(|| "Amenities".to_string(), |t| t.class.clone())
}

/// Name of the nearest Place amenity within `max_distance_from_trail_m`,
/// falling back to its titleized subclass.
pub fn get_cluster_place_title(cluster: &AmenityCluster, max_distance_from_trail_m: f64) -> Option<String> {
    let best = cluster
        .amenities
        .iter()
        .filter(|a| a.is_place() && a.distance_from_trail_m <= max_distance_from_trail_m)
        .min_by(|a, b| a.distance_from_trail_m.total_cmp(&b.distance_from_trail_m))?;

    if let Some(name) = non_empty(&best.name) {
        return Some(name.to_string());
    }
    non_empty(&best.subclass).map(titleize)
}

/// Title shown on a cluster header.
///
/// Single-amenity clusters read "Subclass: Name" so the detail list does not
/// repeat the header. Larger clusters use a nearby settlement, then the first
/// named amenity, then the dominant class.
pub fn get_cluster_display_title(cluster: &AmenityCluster) -> ClusterTitle {
    if let [only] = cluster.amenities.as_slice() {
        let single = match (non_empty(&only.name), non_empty(&only.subclass)) {
            (Some(name), Some(subclass)) => Some(format!("{}: {}", titleize(subclass), name)),
            (Some(name), None) => Some(name.to_string()),
            (None, Some(subclass)) => Some(titleize(subclass)),
            (None, None) => None,
        };
        if let Some(title) = single {
            return ClusterTitle { title, is_place_header: false };
        }
    }

    if let Some(title) = get_cluster_place_title(cluster, PLACE_HEADER_MAX_DISTANCE_M) {
        return ClusterTitle { title, is_place_header: true };
    }

    let title = cluster
        .amenities
        .iter()
        .find_map(|a| non_empty(&a.name))
        .map(str::to_string)
        .unwrap_or_else(|| pick_cluster_title(&cluster.counts_by_class));

    ClusterTitle { title, is_place_header: false }
}
