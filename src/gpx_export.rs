//! GPX 1.1 export of a route's geometry.

use geo::Point;
use ::gpx::{Gpx, GpxVersion, Metadata, Track, TrackSegment, Waypoint};
use log::debug;

use crate::error::{ItineraryError, Result};
use crate::geometry::RouteGeometry;

pub const GPX_CREATOR: &str = "Trailfox";
const DEFAULT_TRACK_NAME: &str = "Route";

/// Serialize `geometry` as a GPX document with one track.
///
/// Each geometry part becomes its own `<trkseg>`. The metadata and track
/// name come from the feature's `name` property.
pub fn create_gpx(geometry: &RouteGeometry) -> Result<String> {
    if geometry.points().next().is_none() {
        return Err(ItineraryError::MissingGeometry);
    }

    let name = geometry
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_TRACK_NAME.to_string());

    let segments: Vec<TrackSegment> = geometry
        .parts
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| TrackSegment {
            points: part
                .iter()
                .map(|p| Waypoint::new(Point::new(p.longitude, p.latitude)))
                .collect(),
        })
        .collect();

    let mut track = Track::new();
    track.name = Some(name.clone());
    track.segments = segments;

    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(GPX_CREATOR.to_string()),
        metadata: Some(Metadata {
            name: Some(name),
            ..Default::default()
        }),
        tracks: vec![track],
        ..Default::default()
    };

    let mut buf: Vec<u8> = Vec::new();
    ::gpx::write(&gpx, &mut buf)?;

    debug!(
        "[Gpx] Wrote {} segment(s), {} bytes",
        gpx.tracks[0].segments.len(),
        buf.len()
    );

    Ok(String::from_utf8_lossy(&buf).into_owned())
}
