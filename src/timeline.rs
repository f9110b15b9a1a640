//! Assembly of the itinerary timeline shown on the route screen.
//!
//! The timeline is the endpoint-framed cluster list, optionally joined by a
//! synthetic `user-location` entry, ordered by distance from the chosen
//! start point.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::clusters::{
    add_itinerary_endpoint_clusters, build_amenity_clusters, filter_by_classes, get_available_classes,
    get_total_amenities,
};
use crate::geo_utils::haversine_distance;
use crate::geometry::RouteGeometry;
use crate::metrics::{calculate_km_from_start, calculate_user_metrics, is_route_circular};
use crate::model::{AmenityCluster, Route, RouteAmenity};
use crate::GpsPoint;

/// Key of the synthetic cluster marking the user's position.
pub const USER_LOCATION_KEY: &str = "user-location";

/// Vertical spacing of the timeline in the app, pixels per kilometer.
pub const DEFAULT_PIXELS_PER_KM: f64 = 90.0;

/// Inputs of [`build_timeline`] besides the clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineContext<'a> {
    pub user_location: Option<GpsPoint>,
    pub geometry: Option<&'a RouteGeometry>,
    /// User-chosen start position in km; 0 when unset
    pub custom_start_km: Option<f64>,
    pub total_length_km: f64,
    pub is_circular: bool,
}

/// Index of the cluster whose centroid is closest to `point`.
/// The user-location entry itself is never returned.
pub fn nearest_cluster_index(clusters: &[AmenityCluster], point: &GpsPoint) -> Option<usize> {
    clusters
        .iter()
        .enumerate()
        .filter(|(_, c)| c.key != USER_LOCATION_KEY)
        .map(|(i, c)| (i, haversine_distance(point, &c.centroid())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

fn user_location_cluster(user: &GpsPoint, ctx: &TimelineContext<'_>, clusters: &[AmenityCluster]) -> Option<AmenityCluster> {
    let fallback_km = nearest_cluster_index(clusters, user).map(|i| clusters[i].trail_km);

    let next_cluster = fallback_km.and_then(|km| {
        clusters
            .iter()
            .filter(|c| c.trail_km > km)
            .min_by(|a, b| a.trail_km.total_cmp(&b.trail_km))
    });

    let metrics = ctx
        .geometry
        .and_then(|g| calculate_user_metrics(user, g, next_cluster));

    let trail_km = metrics.map(|m| m.km_on_trail).or(fallback_km)?;

    let mut cluster = AmenityCluster::new(USER_LOCATION_KEY, trail_km);
    cluster.lon = user.longitude;
    cluster.lat = user.latitude;
    cluster.user_metrics = metrics;
    Some(cluster)
}

/// Timeline entries with `km_from_start` filled in, ascending.
///
/// When a user location is given, a `user-location` entry is placed at the
/// projected trail position, or at the nearest cluster's position when the
/// geometry cannot be projected onto. It sorts before clusters at the same
/// distance.
pub fn build_timeline(clusters: &[AmenityCluster], ctx: &TimelineContext<'_>) -> Vec<AmenityCluster> {
    let mut entries: Vec<AmenityCluster> = clusters
        .iter()
        .filter(|c| c.key != USER_LOCATION_KEY)
        .cloned()
        .collect();

    if let Some(user) = ctx.user_location.as_ref() {
        match user_location_cluster(user, ctx, &entries) {
            Some(cluster) => entries.push(cluster),
            None => debug!("[Timeline] No position for user location"),
        }
    }

    let start_km = ctx.custom_start_km.unwrap_or(0.0);
    for entry in &mut entries {
        entry.km_from_start = Some(calculate_km_from_start(
            entry.trail_km,
            start_km,
            ctx.total_length_km,
            ctx.is_circular,
        ));
    }

    entries.sort_by(|a, b| {
        a.timeline_km()
            .total_cmp(&b.timeline_km())
            .then_with(|| (b.key == USER_LOCATION_KEY).cmp(&(a.key == USER_LOCATION_KEY)))
    });

    entries
}

/// Gap above entry `index`, proportional to the distance from the entry
/// before it. The first entry has none.
pub fn timeline_margin_top(displayed: &[AmenityCluster], index: usize, pixels_per_km: f64) -> f64 {
    if index == 0 || index >= displayed.len() {
        return 0.0;
    }
    let gap_km = displayed[index].timeline_km() - displayed[index - 1].timeline_km();
    gap_km.abs() * pixels_per_km
}

/// Everything the route screen needs, assembled from one route's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub route: Route,
    /// Endpoint-framed clusters, ascending by `trail_km`
    pub clusters: Vec<AmenityCluster>,
    /// Classes in the unfiltered amenity list, most frequent first
    pub available_classes: Vec<String>,
    /// Real amenities in the clusters, endpoints excluded
    pub total_amenities: u32,
    pub is_circular: bool,
    pub total_length_km: f64,
}

impl Itinerary {
    /// Filter, cluster and frame the amenities of `route`.
    pub fn assemble(
        route: Route,
        geometry: Option<&RouteGeometry>,
        amenities: &[RouteAmenity],
        bucket_km: f64,
        allowed_classes: &[String],
    ) -> Self {
        let available_classes = get_available_classes(amenities);
        let filtered = filter_by_classes(amenities, allowed_classes);
        let clustered = build_amenity_clusters(&filtered, bucket_km);
        let total_amenities = get_total_amenities(&clustered) as u32;
        let clusters = add_itinerary_endpoint_clusters(&clustered, &route);

        let is_circular = geometry.map_or(false, is_route_circular);
        let total_length_km = route
            .length_km()
            .or_else(|| geometry.map(RouteGeometry::total_length_km))
            .unwrap_or(0.0);

        info!(
            "[Timeline] Route {}: {} amenities in {} clusters, {:.1} km, circular={}",
            route.osm_id,
            total_amenities,
            clusters.len(),
            total_length_km,
            is_circular
        );

        Self {
            route,
            clusters,
            available_classes,
            total_amenities,
            is_circular,
            total_length_km,
        }
    }

    /// Timeline for the current user position and chosen start.
    pub fn timeline(
        &self,
        geometry: Option<&RouteGeometry>,
        user_location: Option<GpsPoint>,
        custom_start_km: Option<f64>,
    ) -> Vec<AmenityCluster> {
        build_timeline(
            &self.clusters,
            &TimelineContext {
                user_location,
                geometry,
                custom_start_km,
                total_length_km: self.total_length_km,
                is_circular: self.is_circular,
            },
        )
    }
}
