//! HTTP client for the trail API (PostgREST).
//!
//! This module provides:
//! - Paged route listing with optional exact counts
//! - Route geometry as GeoJSON
//! - Amenities along a route
//! - Concurrent itinerary loading (geometry and amenities in flight together)
//!
//! Every request carries the configured timeout. There are no retries: the
//! screens re-issue requests on the next query change anyway.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::header::{ACCEPT, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{ItineraryError, Result};
use crate::geometry::RouteGeometry;
use crate::model::{Route, RouteAmenity};
use crate::routes::{is_itinerary_enabled, SortOption};
use crate::timeline::Itinerary;
use crate::Bounds;

pub const ROUTE_SELECT_FIELDS: &str =
    "osm_id,name,network,length_m,route_type,symbol,geom_quality,merged_geom_type,tags";

pub const AMENITY_SELECT_FIELDS: &str =
    "route_osm_id,osm_type,osm_id,name,class,subclass,lon,lat,distance_from_trail_m,trail_km,tags";

/// Page size of the discovery list.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One page request of the route list.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub offset: u32,
    pub limit: u32,
    pub sort: Option<SortOption>,
    pub search: Option<String>,
    /// Restrict to routes overlapping the visible map area
    pub bbox: Option<Bounds>,
    /// Ask the server for the total row count
    pub exact_count: bool,
}

impl Default for RouteQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
            sort: None,
            search: None,
            bbox: None,
            exact_count: true,
        }
    }
}

/// A page of routes and, when requested, the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePage {
    pub routes: Vec<Route>,
    pub total_count: Option<u64>,
}

/// Route metadata, geometry and amenities loaded together.
#[derive(Debug, Clone)]
pub struct LoadedItinerary {
    pub itinerary: Itinerary,
    /// Missing when the geometry request failed; metrics are unavailable then
    pub geometry: Option<RouteGeometry>,
}

#[derive(Debug, Serialize)]
struct DistanceArgs {
    lon: f64,
    lat: f64,
}

/// Characters with meaning inside a PostgREST `or=(...)` filter.
fn sanitize_search(q: &str) -> String {
    q.chars()
        .filter(|c| !matches!(*c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Resource path and query parameters for a route list request.
///
/// Without a bbox the `routes` table is queried directly; with one the
/// `routes_in_bbox` function is, taking the box as arguments.
pub fn route_query_params(query: &RouteQuery) -> (String, Vec<(String, String)>) {
    let mut params: Vec<(String, String)> = vec![("select".into(), ROUTE_SELECT_FIELDS.into())];

    let path = match &query.bbox {
        Some(b) => {
            params.push(("min_lon".into(), b.min_lng.to_string()));
            params.push(("min_lat".into(), b.min_lat.to_string()));
            params.push(("max_lon".into(), b.max_lng.to_string()));
            params.push(("max_lat".into(), b.max_lat.to_string()));
            "rpc/routes_in_bbox"
        }
        None => "routes",
    };

    if let Some(q) = query.search.as_deref().map(sanitize_search).filter(|q| !q.is_empty()) {
        params.push(("or".into(), format!("(name.ilike.*{q}*,network.ilike.*{q}*)")));
    }

    match query.sort {
        Some(SortOption::Name) => params.push(("order".into(), "name.asc.nullslast".into())),
        Some(SortOption::Length) => params.push(("order".into(), "length_m.desc.nullslast".into())),
        // Distance needs a reference point; see `routes_by_distance`
        Some(SortOption::Distance) | None => {}
    }

    params.push(("limit".into(), query.limit.to_string()));
    params.push(("offset".into(), query.offset.to_string()));

    (path.to_string(), params)
}

/// Total from a PostgREST `Content-Range` header such as `0-49/1234`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

/// Client for the trail API.
pub struct TrailApiClient {
    client: Client,
    api_root: String,
    timeout_ms: u64,
    developer_mode: bool,
}

impl TrailApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ItineraryError::Http(format!("Failed to create HTTP client: {}", e)))?;

        config.log_if_developer();

        Ok(Self {
            client,
            api_root: config.api_root(),
            timeout_ms: config.timeout_ms,
            developer_mode: config.developer_mode,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ItineraryError {
        if e.is_timeout() {
            ItineraryError::Timeout { timeout_ms: self.timeout_ms }
        } else {
            ItineraryError::Http(e.to_string())
        }
    }

    async fn send(&self, label: &str, request: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!("[TrailApi] {} failed after {:?}: {}", label, start.elapsed(), e);
            self.map_send_error(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("[TrailApi] {} -> {}", label, status);
            return Err(ItineraryError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        if self.developer_mode {
            info!("[TrailApi] {} -> {} in {:?}", label, status, start.elapsed());
        } else {
            debug!("[TrailApi] {} -> {} in {:?}", label, status, start.elapsed());
        }
        Ok(response)
    }

    async fn body_bytes(&self, response: Response) -> Result<Vec<u8>> {
        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        Ok(bytes.to_vec())
    }

    /// One page of the route list.
    pub async fn fetch_routes(&self, query: &RouteQuery) -> Result<RoutePage> {
        let (path, params) = route_query_params(query);
        let mut request = self.client.get(self.url(&path)).query(&params);
        if query.exact_count {
            request = request.header("Prefer", "count=exact");
        }

        let response = self.send("routes", request).await?;
        let total_count = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let body = self.body_bytes(response).await?;
        let routes: Vec<Route> = serde_json::from_slice(&body)?;

        debug!(
            "[TrailApi] {} routes (offset {}, total {:?})",
            routes.len(),
            query.offset,
            total_count
        );
        Ok(RoutePage { routes, total_count })
    }

    /// GeoJSON geometry of one route.
    pub async fn fetch_route_geometry(&self, osm_id: i64) -> Result<RouteGeometry> {
        let request = self
            .client
            .get(self.url("routes"))
            .query(&[("osm_id", format!("eq.{}", osm_id))])
            .header(ACCEPT, "application/geo+json");

        let response = self.send("geometry", request).await?;
        let body = self.body_bytes(response).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        RouteGeometry::from_json_value(value)
    }

    /// Amenities within `max_distance_from_trail_m` of a route.
    pub async fn fetch_route_amenities(
        &self,
        route_osm_id: i64,
        max_distance_from_trail_m: f64,
    ) -> Result<Vec<RouteAmenity>> {
        let request = self.client.get(self.url("route_amenities")).query(&[
            ("select", AMENITY_SELECT_FIELDS.to_string()),
            ("route_osm_id", format!("eq.{}", route_osm_id)),
            ("distance_from_trail_m", format!("lte.{}", max_distance_from_trail_m)),
        ]);

        let response = self.send("amenities", request).await?;
        let body = self.body_bytes(response).await?;
        let amenities: Vec<RouteAmenity> = serde_json::from_slice(&body)?;
        debug!("[TrailApi] Route {}: {} amenities", route_osm_id, amenities.len());
        Ok(amenities)
    }

    /// Routes ordered by distance from a point.
    pub async fn routes_by_distance(&self, lon: f64, lat: f64) -> Result<Vec<Route>> {
        let request = self
            .client
            .post(self.url("rpc/routes_by_distance"))
            .json(&DistanceArgs { lon, lat });

        let response = self.send("routes_by_distance", request).await?;
        let body = self.body_bytes(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Load geometry and amenities of `route` concurrently and assemble the
    /// itinerary. A failed geometry request only disables live metrics; a
    /// failed amenity request fails the whole load.
    ///
    /// Amenities are fetched within [`ClientConfig::amenity_radius_m`].
    /// Split routes are refused unless `allow_multilinestring` is set.
    pub async fn fetch_itinerary(
        &self,
        route: Route,
        config: &ClientConfig,
        allowed_classes: &[String],
    ) -> Result<LoadedItinerary> {
        if !is_itinerary_enabled(&route, config.allow_multilinestring) {
            return Err(ItineraryError::InvalidGeometry(format!(
                "itinerary disabled for MultiLineString route {}",
                route.osm_id
            )));
        }

        let start = Instant::now();
        let (geometry, amenities) = futures::future::join(
            self.fetch_route_geometry(route.osm_id),
            self.fetch_route_amenities(route.osm_id, config.amenity_radius_m()),
        )
        .await;

        let amenities = amenities?;
        let geometry = match geometry {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("[TrailApi] Route {} geometry unavailable: {}", route.osm_id, e);
                None
            }
        };

        let itinerary = Itinerary::assemble(
            route,
            geometry.as_ref(),
            &amenities,
            config.cluster_bucket_km,
            allowed_classes,
        );

        info!(
            "[TrailApi] Itinerary for route {} loaded in {:?}",
            itinerary.route.osm_id,
            start.elapsed()
        );

        Ok(LoadedItinerary { itinerary, geometry })
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|e| ItineraryError::Runtime(e.to_string()))
}

/// Synchronous wrapper for FFI: runs [`TrailApiClient::fetch_routes`] on a
/// fresh tokio runtime.
pub fn fetch_routes_sync(config: &ClientConfig, query: &RouteQuery) -> Result<RoutePage> {
    let rt = runtime()?;
    let client = TrailApiClient::new(config)?;
    rt.block_on(client.fetch_routes(query))
}

pub fn routes_by_distance_sync(config: &ClientConfig, lon: f64, lat: f64) -> Result<Vec<Route>> {
    let rt = runtime()?;
    let client = TrailApiClient::new(config)?;
    rt.block_on(client.routes_by_distance(lon, lat))
}

pub fn fetch_itinerary_sync(
    config: &ClientConfig,
    route: Route,
    allowed_classes: &[String],
) -> Result<LoadedItinerary> {
    let rt = runtime()?;
    let client = TrailApiClient::new(config)?;
    rt.block_on(client.fetch_itinerary(route, config, allowed_classes))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn local_config(base_url: String, timeout_ms: u64) -> ClientConfig {
        ClientConfig { api_base_url: base_url, timeout_ms, ..Default::default() }
    }

    /// Answers one request with `headers` and `body`, then yields the raw
    /// request head (lowercased).
    async fn serve_once(headers: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                headers,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&head).to_lowercase()
        });

        (base_url, handle)
    }

    #[test]
    fn test_default_query_params() {
        let (path, params) = route_query_params(&RouteQuery::default());
        assert_eq!(path, "routes");
        assert_eq!(param(&params, "select"), Some(ROUTE_SELECT_FIELDS));
        assert_eq!(param(&params, "limit"), Some("50"));
        assert_eq!(param(&params, "offset"), Some("0"));
        assert!(param(&params, "order").is_none());
        assert!(param(&params, "or").is_none());
    }

    #[test]
    fn test_search_and_sort_params() {
        let query = RouteQuery {
            offset: 100,
            sort: Some(SortOption::Length),
            search: Some(" Mullerthal (East), ".to_string()),
            ..Default::default()
        };
        let (_, params) = route_query_params(&query);
        assert_eq!(
            param(&params, "or"),
            Some("(name.ilike.*Mullerthal East*,network.ilike.*Mullerthal East*)")
        );
        assert_eq!(param(&params, "order"), Some("length_m.desc.nullslast"));
        assert_eq!(param(&params, "offset"), Some("100"));
    }

    #[test]
    fn test_bbox_uses_rpc() {
        let query = RouteQuery {
            bbox: Some(Bounds { min_lat: 49.0, max_lat: 50.0, min_lng: 6.0, max_lng: 7.0 }),
            ..Default::default()
        };
        let (path, params) = route_query_params(&query);
        assert_eq!(path, "rpc/routes_in_bbox");
        assert_eq!(param(&params, "min_lon"), Some("6"));
        assert_eq!(param(&params, "max_lat"), Some("50"));
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range_total("0-49/1234"), Some(1234));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-49/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_http_error() {
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 2000,
            ..Default::default()
        };
        let client = TrailApiClient::new(&config).unwrap();
        let err = client.fetch_route_amenities(1, 1000.0).await.unwrap_err();
        assert!(matches!(err, ItineraryError::Http(_) | ItineraryError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_stalled_server_is_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = TrailApiClient::new(&local_config(base_url, 300)).unwrap();
        let started = Instant::now();
        let err = client.fetch_route_amenities(1, 1000.0).await.unwrap_err();

        assert!(matches!(err, ItineraryError::Timeout { timeout_ms: 300 }), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
        server.abort();
    }

    #[tokio::test]
    async fn test_route_page_asks_for_exact_count() {
        let (base_url, server) = serve_once(
            "Content-Type: application/json\r\nContent-Range: 0-0/42\r\n",
            r#"[{"osm_id":1,"name":"Mullerthal Trail"}]"#,
        )
        .await;

        let client = TrailApiClient::new(&local_config(base_url, 5000)).unwrap();
        let page = client.fetch_routes(&RouteQuery::default()).await.unwrap();
        let head = server.await.unwrap();

        assert_eq!(page.total_count, Some(42));
        assert_eq!(page.routes.len(), 1);
        assert_eq!(page.routes[0].name.as_deref(), Some("Mullerthal Trail"));
        assert!(head.starts_with("get /api/routes?"), "{}", head);
        assert!(head.contains("prefer: count=exact"), "{}", head);
    }

    #[tokio::test]
    async fn test_route_page_without_count() {
        let (base_url, server) = serve_once("Content-Type: application/json\r\n", "[]").await;

        let client = TrailApiClient::new(&local_config(base_url, 5000)).unwrap();
        let query = RouteQuery { exact_count: false, ..Default::default() };
        let page = client.fetch_routes(&query).await.unwrap();
        let head = server.await.unwrap();

        assert_eq!(page.total_count, None);
        assert!(page.routes.is_empty());
        assert!(!head.contains("prefer:"), "{}", head);
    }

    #[tokio::test]
    async fn test_geometry_request_accepts_geojson() {
        let (base_url, server) = serve_once(
            "Content-Type: application/geo+json\r\n",
            r#"{"type":"Feature","properties":{"length_m":1500.0},"geometry":{"type":"LineString","coordinates":[[6.10,49.60],[6.12,49.61]]}}"#,
        )
        .await;

        let client = TrailApiClient::new(&local_config(base_url, 5000)).unwrap();
        let geometry = client.fetch_route_geometry(77).await.unwrap();
        let head = server.await.unwrap();

        assert_eq!(geometry.parts.len(), 1);
        assert_eq!(geometry.parts[0].len(), 2);
        assert!(head.starts_with("get /api/routes?osm_id=eq.77 "), "{}", head);
        assert!(head.contains("accept: application/geo+json"), "{}", head);
    }

    #[tokio::test]
    async fn test_split_route_refused_without_opt_in() {
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            allow_multilinestring: false,
            ..Default::default()
        };
        let route = Route {
            osm_id: 5,
            merged_geom_type: Some("MULTILINESTRING".to_string()),
            ..Default::default()
        };
        let client = TrailApiClient::new(&config).unwrap();
        let err = client.fetch_itinerary(route, &config, &[]).await.unwrap_err();
        assert!(matches!(err, ItineraryError::InvalidGeometry(_)));
    }
}
