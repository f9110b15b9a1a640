//! # Trailfox Core
//!
//! Itinerary building and live trail position for hiking route apps.
//!
//! This library provides:
//! - Amenity clustering along a route, framed by start/end entries
//! - Cluster titles that prefer nearby settlements
//! - The user's position on the trail, consistent with server-side `trail_km`
//! - Route list filtering and GPX export
//! - A client for the trail API (PostgREST)
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`clusters`] | Amenities bucketed by trail km, class filter, start/end entries |
//! | [`titles`] | Header text for a cluster |
//! | [`metrics`] | User position, off-trail distance, circularity |
//! | [`timeline`] | Ordered timeline with the user entry, [`Itinerary`] aggregate |
//! | [`routes`] | Discovery list filtering, sorting and display helpers |
//! | [`geometry`] | Route GeoJSON as line parts |
//! | [`geo_utils`] | Haversine distances, bounds, centers |
//! | [`gpx_export`] | GPX 1.1 export |
//! | [`config`] | Client settings and API base URL resolution |
//! | [`session`] | Debounce and stale-response guards for the screens |
//! | `http` | Trail API client (feature `http`) |
//!
//! ## Features
//!
//! - **`http`** - Enable the HTTP client for the trail API
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trailfox_core::{GpsPoint, Route, RouteAmenity, OsmElementType};
//! use trailfox_core::geometry::RouteGeometry;
//! use trailfox_core::timeline::Itinerary;
//!
//! let route = Route { osm_id: 1, length_m: Some(111_195.0), ..Default::default() };
//! let geometry = RouteGeometry::from_points(vec![
//!     GpsPoint::new(0.0, 0.0),
//!     GpsPoint::new(0.0, 1.0),
//! ]);
//! let amenities = vec![RouteAmenity {
//!     route_osm_id: 1, osm_type: OsmElementType::Node, osm_id: 10,
//!     name: Some("Spring".into()), class: "water".into(), subclass: None,
//!     lon: 0.3, lat: 0.001, distance_from_trail_m: 110.0, trail_km: 33.4, tags: None,
//! }];
//!
//! let itinerary = Itinerary::assemble(route, Some(&geometry), &amenities, 0.5, &[]);
//! let timeline = itinerary.timeline(Some(&geometry), Some(GpsPoint::new(0.01, 0.2)), None);
//!
//! for entry in &timeline {
//!     println!("{:>6.1} km  {}", entry.km_from_start.unwrap_or(0.0), entry.key);
//! }
//! ```
//!
//! ## Mobile Bindings
//!
//! With `ffi`, the `ffi_*` functions are exported through uniffi. Geometry
//! crosses the boundary as a GeoJSON string and is parsed on the Rust side.
//! Network calls block on an internal tokio runtime and report failure in
//! `success`/`error` fields instead of throwing. Logs go to logcat under the
//! `TrailfoxRust` tag on Android.

pub mod clusters;
pub mod config;
pub mod error;
pub mod geo_utils;
pub mod geometry;
pub mod gpx_export;
pub mod metrics;
pub mod model;
pub mod routes;
pub mod session;
pub mod timeline;
pub mod titles;

// HTTP module for the trail API
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{LoadedItinerary, RoutePage, RouteQuery, TrailApiClient};

pub use clusters::{add_itinerary_endpoint_clusters, build_amenity_clusters, get_available_classes};
pub use config::{resolve_api_base_url, ClientConfig, Environment, Platform, StartLocation};
pub use error::ItineraryError;
pub use geometry::RouteGeometry;
pub use gpx_export::create_gpx;
pub use metrics::{calculate_km_from_start, calculate_user_metrics, is_route_circular};
pub use model::{
    AmenityCluster, ClassCount, ClusterTitle, OsmElementType, Route, RouteAmenity, UserItineraryMetrics,
};
pub use timeline::{build_timeline, Itinerary, TimelineContext};
pub use titles::get_cluster_display_title;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TrailfoxRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trailfox_core::GpsPoint;
/// let point = GpsPoint::new(49.6116, 6.1319); // Luxembourg
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a route or map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{debug, info, warn};

    fn parse_geometry(geojson: &str) -> Option<RouteGeometry> {
        match RouteGeometry::from_geojson_str(geojson) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("[TrailfoxRust] Unusable route geometry: {}", e);
                None
            }
        }
    }

    /// Group amenities into trail-distance buckets.
    ///
    /// # Arguments
    ///
    /// * `amenities` - Amenities of one route, as returned by the API
    /// * `bucket_km` - Bucket width along the trail in kilometers
    ///
    /// # Returns
    ///
    /// Clusters ordered by trail km. Empty if `bucket_km` is not a positive number.
    #[uniffi::export]
    pub fn ffi_build_amenity_clusters(amenities: Vec<RouteAmenity>, bucket_km: f64) -> Vec<AmenityCluster> {
        init_logging();
        info!("[TrailfoxRust] 🦀 build_amenity_clusters: {} amenities, {} km buckets", amenities.len(), bucket_km);
        build_amenity_clusters(&amenities, bucket_km)
    }

    /// Add start/end entries so the timeline spans the whole route.
    #[uniffi::export]
    pub fn ffi_add_itinerary_endpoint_clusters(clusters: Vec<AmenityCluster>, route: Route) -> Vec<AmenityCluster> {
        init_logging();
        add_itinerary_endpoint_clusters(&clusters, &route)
    }

    /// Distinct amenity classes, in order of first appearance.
    #[uniffi::export]
    pub fn ffi_get_available_classes(amenities: Vec<RouteAmenity>) -> Vec<String> {
        get_available_classes(&amenities)
    }

    /// Header title for a cluster, preferring a nearby place name.
    #[uniffi::export]
    pub fn ffi_get_cluster_display_title(cluster: AmenityCluster) -> ClusterTitle {
        get_cluster_display_title(&cluster)
    }

    /// User metrics from a route GeoJSON string.
    ///
    /// # Arguments
    ///
    /// * `user` - Current GPS fix
    /// * `geojson` - Route geometry (Feature, FeatureCollection or bare geometry)
    /// * `next_cluster` - Cluster ahead of the user, for the distance-to-next figure
    ///
    /// # Returns
    ///
    /// `None` when the fix is invalid or the geometry unusable, which hides
    /// the metrics panel.
    #[uniffi::export]
    pub fn ffi_calculate_user_metrics(
        user: GpsPoint,
        geojson: String,
        next_cluster: Option<AmenityCluster>,
    ) -> Option<UserItineraryMetrics> {
        init_logging();
        let result = metrics::calculate_user_metrics_from_geojson(&user, &geojson, next_cluster.as_ref());
        if let Some(ref m) = result {
            debug!(
                "[TrailfoxRust] 🦀 km_on_trail={:.2} off_trail={:.2} to_end={:.2}",
                m.km_on_trail, m.distance_off_trail, m.distance_to_end
            );
        }
        result
    }

    /// Whether the route ends near where it starts. False for unusable GeoJSON.
    #[uniffi::export]
    pub fn ffi_is_route_circular(geojson: String) -> bool {
        init_logging();
        parse_geometry(&geojson).is_some_and(|g| is_route_circular(&g))
    }

    #[uniffi::export]
    pub fn ffi_calculate_km_from_start(current_km: f64, start_km: f64, total_length: f64, is_circular: bool) -> f64 {
        calculate_km_from_start(current_km, start_km, total_length, is_circular)
    }

    /// Timeline entries ordered by distance from the chosen start.
    ///
    /// # Arguments
    ///
    /// * `clusters` - Clusters including the start/end entries
    /// * `user_location` - Current fix, adds the user entry when it can be placed
    /// * `geojson` - Route geometry used to place the user
    /// * `custom_start_km` - Trail km the user chose as start, if any
    /// * `total_length_km` - Route length, used to wrap circular routes
    /// * `is_circular` - Whether km before the custom start wrap to the end
    ///
    /// # Returns
    ///
    /// Entries sorted by `km_from_start`. On equal km the user entry comes
    /// first and the others keep their input order.
    #[uniffi::export]
    pub fn ffi_build_timeline(
        clusters: Vec<AmenityCluster>,
        user_location: Option<GpsPoint>,
        geojson: Option<String>,
        custom_start_km: Option<f64>,
        total_length_km: f64,
        is_circular: bool,
    ) -> Vec<AmenityCluster> {
        init_logging();
        let geometry = geojson.as_deref().and_then(parse_geometry);
        let timeline = build_timeline(
            &clusters,
            &TimelineContext {
                user_location,
                geometry: geometry.as_ref(),
                custom_start_km,
                total_length_km,
                is_circular,
            },
        );
        info!("[TrailfoxRust] 🦀 build_timeline: {} entries", timeline.len());
        timeline
    }

    /// Top margin in pixels for the entry at `index` of the displayed timeline.
    #[uniffi::export]
    pub fn ffi_timeline_margin_top(displayed: Vec<AmenityCluster>, index: u32, pixels_per_km: f64) -> f64 {
        timeline::timeline_margin_top(&displayed, index as usize, pixels_per_km)
    }

    #[uniffi::export]
    pub fn ffi_filter_and_sort_routes(list: Vec<Route>, filter: routes::RouteFilter) -> Vec<Route> {
        routes::filter_and_sort_routes(&list, &filter)
    }

    /// GPX document for a route GeoJSON string, or `None` if it has no usable line.
    #[uniffi::export]
    pub fn ffi_create_gpx(geojson: String) -> Option<String> {
        init_logging();
        let geometry = parse_geometry(&geojson)?;
        match create_gpx(&geometry) {
            Ok(xml) => Some(xml),
            Err(e) => {
                warn!("[TrailfoxRust] GPX export failed: {}", e);
                None
            }
        }
    }

    /// API server for the running client. See [`resolve_api_base_url`].
    #[uniffi::export]
    pub fn ffi_resolve_api_base_url(env: Environment) -> String {
        init_logging();
        resolve_api_base_url(&env)
    }

    /// Get default client configuration.
    #[uniffi::export]
    pub fn default_client_config() -> ClientConfig {
        ClientConfig::default()
    }

    // ========================================================================
    // Trail API
    // ========================================================================

    /// A page of routes, or the error that prevented loading it.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiRoutePage {
        pub routes: Vec<Route>,
        pub total_count: Option<u64>,
        pub success: bool,
        pub error: Option<String>,
    }

    /// Assembled itinerary, or the error that prevented loading it.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiItinerary {
        pub clusters: Vec<AmenityCluster>,
        pub available_classes: Vec<String>,
        pub total_amenities: u32,
        pub is_circular: bool,
        pub total_length_km: f64,
        pub geometry: Option<RouteGeometry>,
        pub success: bool,
        pub error: Option<String>,
    }

    /// Load one page of the route list.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration (base URL, timeout)
    /// * `offset`, `limit` - Page window
    /// * `sort` - Server-side ordering, `None` for the API default
    /// * `search` - Free text matched against name and network
    /// * `bbox` - Restrict to routes overlapping the visible map
    ///
    /// # Returns
    ///
    /// The page with the server's exact total count, or `success: false` with
    /// the error message.
    #[uniffi::export]
    pub fn ffi_fetch_routes(
        config: ClientConfig,
        offset: u32,
        limit: u32,
        sort: Option<routes::SortOption>,
        search: Option<String>,
        bbox: Option<Bounds>,
    ) -> FfiRoutePage {
        init_logging();
        info!("[TrailfoxRust] 🦀 fetch_routes offset={} limit={}", offset, limit);

        let query = crate::http::RouteQuery {
            offset,
            limit,
            sort,
            search,
            bbox,
            exact_count: true,
        };
        match crate::http::fetch_routes_sync(&config, &query) {
            Ok(page) => FfiRoutePage {
                routes: page.routes,
                total_count: page.total_count,
                success: true,
                error: None,
            },
            Err(e) => FfiRoutePage {
                routes: vec![],
                total_count: None,
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Routes ordered by distance from a point. `total_count` is never set.
    #[uniffi::export]
    pub fn ffi_routes_by_distance(config: ClientConfig, lon: f64, lat: f64) -> FfiRoutePage {
        init_logging();
        match crate::http::routes_by_distance_sync(&config, lon, lat) {
            Ok(routes) => FfiRoutePage {
                routes,
                total_count: None,
                success: true,
                error: None,
            },
            Err(e) => FfiRoutePage {
                routes: vec![],
                total_count: None,
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Load geometry and amenities of a route and assemble its itinerary.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration, also supplies bucket size and radius
    /// * `route` - Route from the list
    /// * `allowed_classes` - Amenity classes to keep, empty for all
    ///
    /// # Returns
    ///
    /// The itinerary with its parsed geometry. A failed geometry request still
    /// succeeds with `geometry: None`. A failed amenity request, or a split
    /// route while split routes are disabled, gives `success: false`.
    #[uniffi::export]
    pub fn ffi_fetch_itinerary(config: ClientConfig, route: Route, allowed_classes: Vec<String>) -> FfiItinerary {
        init_logging();
        info!("[TrailfoxRust] 🦀 fetch_itinerary for route {}", route.osm_id);

        match crate::http::fetch_itinerary_sync(&config, route, &allowed_classes) {
            Ok(loaded) => FfiItinerary {
                clusters: loaded.itinerary.clusters,
                available_classes: loaded.itinerary.available_classes,
                total_amenities: loaded.itinerary.total_amenities,
                is_circular: loaded.itinerary.is_circular,
                total_length_km: loaded.itinerary.total_length_km,
                geometry: loaded.geometry,
                success: true,
                error: None,
            },
            Err(e) => {
                warn!("[TrailfoxRust] Itinerary load failed: {}", e);
                FfiItinerary {
                    clusters: vec![],
                    available_classes: vec![],
                    total_amenities: 0,
                    is_circular: false,
                    total_length_km: 0.0,
                    geometry: None,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
