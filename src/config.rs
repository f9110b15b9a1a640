//! Client configuration and API base URL resolution.

use log::info;
use serde::{Deserialize, Serialize};

use crate::GpsPoint;

/// Port of the local reverse proxy fronting the API in development.
pub const DEV_PROXY_PORT: u16 = 8090;

/// Expo dev server ports; a web page served from one of these is a dev build.
const EXPO_WEB_PORTS: [&str; 3] = ["8081", "19006", "19000"];

/// Host platform the client runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum Platform {
    Web,
    Ios,
    Android,
    Other,
}

/// What the host knows about where it runs, used to pick the API server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Environment {
    pub platform: Platform,
    /// Explicit server, e.g. `https://trailfox.app`. Wins over everything.
    pub remote_server_url: Option<String>,
    /// Origin of the page on web, e.g. `https://trailfox.app`
    pub web_origin: Option<String>,
    /// `host:port` of the dev bundler on native dev builds
    pub debugger_host: Option<String>,
}

impl Environment {
    pub fn native(platform: Platform) -> Self {
        Self {
            platform,
            remote_server_url: None,
            web_origin: None,
            debugger_host: None,
        }
    }
}

/// Initial map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum StartLocation {
    Luxembourg,
    Munich,
    /// Follow the device position; the map opens on Munich until it is known
    User,
}

impl StartLocation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "luxembourg" => Some(Self::Luxembourg),
            "munich" => Some(Self::Munich),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Initial map center.
    pub fn center(&self) -> GpsPoint {
        match self {
            Self::Luxembourg => GpsPoint::new(49.61, 6.13),
            Self::Munich | Self::User => GpsPoint::new(48.13, 11.58),
        }
    }

    pub fn zoom(&self) -> f64 {
        12.0
    }
}

/// Settings of the trail API client and the itinerary pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClientConfig {
    /// Server root without the `/api` suffix.
    /// Default: `http://localhost:8090` (local dev proxy)
    pub api_base_url: String,

    /// Per-request timeout.
    /// Default: 8000 ms
    pub timeout_ms: u64,

    /// Log resolved settings and request details at info level.
    pub developer_mode: bool,

    pub start_location: StartLocation,

    /// Amenity search radius around the trail when an itinerary opens.
    /// Default: 0.2 km
    pub default_radius_km: f64,

    /// Trail length covered by one timeline cluster.
    /// Default: 0.5 km
    pub cluster_bucket_km: f64,

    /// Upper bound of the amenity search radius.
    /// Default: 1000 m
    pub max_distance_from_trail_m: f64,

    /// Build itineraries for routes whose geometry has several parts.
    /// Default: true
    pub allow_multilinestring: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: format!("http://localhost:{}", DEV_PROXY_PORT),
            timeout_ms: 8000,
            developer_mode: false,
            start_location: StartLocation::Luxembourg,
            default_radius_km: 0.2,
            cluster_bucket_km: 0.5,
            max_distance_from_trail_m: 1000.0,
            allow_multilinestring: true,
        }
    }
}

impl ClientConfig {
    /// Default settings pointed at the server resolved for `env`.
    pub fn for_environment(env: &Environment) -> Self {
        let config = Self {
            api_base_url: resolve_api_base_url(env),
            ..Default::default()
        };
        config.log_if_developer();
        config
    }

    /// Amenity search radius in meters, capped by `max_distance_from_trail_m`.
    pub fn amenity_radius_m(&self) -> f64 {
        (self.default_radius_km * 1000.0).min(self.max_distance_from_trail_m)
    }

    /// `{base}/api`
    pub fn api_root(&self) -> String {
        format!("{}/api", self.api_base_url.trim_end_matches('/'))
    }

    /// `{base}/tiles`
    pub fn tiles_base_url(&self) -> String {
        format!("{}/tiles", self.api_base_url.trim_end_matches('/'))
    }

    /// Log the effective settings when developer mode is on.
    pub fn log_if_developer(&self) {
        if self.developer_mode {
            info!(
                "[Config] api={} tiles={} start={:?} timeout={}ms",
                self.api_root(),
                self.tiles_base_url(),
                self.start_location,
                self.timeout_ms
            );
        }
    }
}

/// Split an origin like `http://host:port/path` into host and port.
///
/// IPv6 hosts keep their brackets (`http://[::1]:3000` gives `[::1]` and
/// `3000`). The scheme is optional.
fn origin_host_port(origin: &str) -> (&str, Option<&str>) {
    let rest = origin.split_once("://").map_or(origin, |(_, r)| r);
    let authority = rest.split('/').next().unwrap_or(rest);
    if let Some(bracketed) = authority.strip_prefix('[') {
        return match bracketed.find(']') {
            Some(end) => {
                let (host, tail) = authority.split_at(end + 2);
                (host, tail.strip_prefix(':'))
            }
            None => (authority, None),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}

fn is_local_web_host(host: &str, port: Option<&str>) -> bool {
    let loopback = matches!(host, "localhost" | "127.0.0.1" | "[::1]");
    let lan = host.starts_with("192.168.") || host.starts_with("10.") || host.starts_with("172.");
    let dev_port = port.is_some_and(|p| EXPO_WEB_PORTS.contains(&p));
    loopback || lan || dev_port
}

/// Pick the API server for the running client.
///
/// An explicit remote server always wins. Web builds served locally talk to
/// the dev proxy, other web builds to their own origin. Native dev builds
/// reach the proxy on the bundler's host; the Android emulator reaches the
/// host machine through `10.0.2.2`.
pub fn resolve_api_base_url(env: &Environment) -> String {
    if let Some(remote) = env
        .remote_server_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    {
        return remote.trim_end_matches('/').to_string();
    }

    let local = format!("http://localhost:{}", DEV_PROXY_PORT);

    match env.platform {
        Platform::Web => match env.web_origin.as_deref().filter(|o| !o.is_empty()) {
            Some(origin) => {
                let (host, port) = origin_host_port(origin);
                if is_local_web_host(host, port) {
                    local
                } else {
                    origin.trim_end_matches('/').to_string()
                }
            }
            None => local,
        },
        _ => {
            if let Some(ip) = env
                .debugger_host
                .as_deref()
                .map(|h| origin_host_port(h).0)
                .filter(|ip| !ip.is_empty())
            {
                format!("http://{}:{}", ip, DEV_PROXY_PORT)
            } else if env.platform == Platform::Android {
                format!("http://10.0.2.2:{}", DEV_PROXY_PORT)
            } else {
                local
            }
        }
    }
}
