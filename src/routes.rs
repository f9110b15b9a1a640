//! Route list helpers for the discovery screen.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geometry::RouteGeometry;
use crate::model::Route;

/// Sort order of the route list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    Name,
    Length,
    Distance,
}

/// Search text and sort order applied to an already fetched page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteFilter {
    pub search: Option<String>,
    pub sort: Option<SortOption>,
}

/// Routes matching the search, in the requested order.
///
/// Search is a case-insensitive substring match on name or network. Names
/// sort ascending with unnamed routes last, lengths descending, distances
/// ascending with unknown distances last. Without a sort the input order is
/// kept.
pub fn filter_and_sort_routes(routes: &[Route], filter: &RouteFilter) -> Vec<Route> {
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut out: Vec<Route> = routes
        .iter()
        .filter(|r| match &needle {
            None => true,
            Some(q) => [&r.name, &r.network]
                .iter()
                .any(|field| field.as_deref().is_some_and(|v| v.to_lowercase().contains(q.as_str()))),
        })
        .cloned()
        .collect();

    match filter.sort {
        Some(SortOption::Name) => out.sort_by(|a, b| match (&a.name, &b.name) {
            (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        Some(SortOption::Length) => {
            out.sort_by(|a, b| b.length_m.unwrap_or(0.0).total_cmp(&a.length_m.unwrap_or(0.0)))
        }
        Some(SortOption::Distance) => out.sort_by(|a, b| {
            a.distance_m
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_m.unwrap_or(f64::INFINITY))
        }),
        None => {}
    }

    out
}

pub fn display_name(route: &Route) -> &str {
    route
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("Unnamed Route")
}

pub fn geom_quality_label(route: &Route) -> &str {
    route.geom_quality.as_deref().unwrap_or("unknown")
}

/// Geometry flagged usable by the route builder (`ok_*`).
pub fn is_geometry_ok(route: &Route) -> bool {
    route.geom_quality.as_deref().is_some_and(|q| q.starts_with("ok_"))
}

/// Human label for an OSM network code.
pub fn network_label(network: &str) -> &str {
    match network {
        "iwn" => "International",
        "nwn" => "National",
        "rwn" => "Regional",
        "lwn" => "Local",
        other => other,
    }
}

/// Map line color for an OSM network code.
pub fn network_color(network: &str) -> Option<&'static str> {
    match network {
        "iwn" => Some("#e41a1c"),
        "nwn" => Some("#377eb8"),
        "rwn" => Some("#4daf4a"),
        "lwn" => Some("#ff7f00"),
        _ => None,
    }
}

/// Tags already shown elsewhere on the route sheet.
pub const IGNORED_TAGS: [&str; 16] = [
    "network",
    "website",
    "wikipedia",
    "symbol",
    "osmc:symbol",
    "route",
    "type",
    "distance",
    "name",
    "osm_id",
    "length_m",
    "from",
    "to",
    "source",
    "fixme",
    "url",
];

/// Remaining OSM tags for the details list, sorted by key.
pub fn display_tags(route: &Route) -> Vec<(String, String)> {
    let mut tags: Vec<(String, String)> = route
        .tags
        .iter()
        .flatten()
        .filter(|(k, _)| !IGNORED_TAGS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    tags.sort();
    tags
}

/// "12.3 km", or "N/A" when the length is unknown.
pub fn formatted_length(route: &Route) -> String {
    match route.length_km() {
        Some(km) if km.is_finite() => format!("{:.1} km", km),
        _ => "N/A".to_string(),
    }
}

/// True when the merged geometry is split into several lines, either per
/// route metadata or per the decoded geometry.
pub fn is_multilinestring(route: &Route, geometry: Option<&RouteGeometry>) -> bool {
    route
        .merged_geom_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("MultiLineString"))
        || geometry.is_some_and(|g| g.is_multi)
}

/// Whether the itinerary can be opened for `route`. Split routes need
/// `allow_multilinestring`.
pub fn is_itinerary_enabled(route: &Route, allow_multilinestring: bool) -> bool {
    allow_multilinestring || !is_multilinestring(route, None)
}
