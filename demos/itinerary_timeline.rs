//! Build an itinerary timeline from hand-made data, no server needed.
//!
//! Run with: cargo run --example itinerary_timeline

use std::collections::HashMap;

use trailfox_core::geometry::RouteGeometry;
use trailfox_core::timeline::{timeline_margin_top, Itinerary, DEFAULT_PIXELS_PER_KM};
use trailfox_core::titles::get_cluster_display_title;
use trailfox_core::{create_gpx, GpsPoint, OsmElementType, Route, RouteAmenity};

fn amenity(osm_id: i64, class: &str, subclass: Option<&str>, name: Option<&str>, trail_km: f64, lat: f64, lon: f64) -> RouteAmenity {
    RouteAmenity {
        route_osm_id: 42,
        osm_type: OsmElementType::Node,
        osm_id,
        name: name.map(String::from),
        class: class.to_string(),
        subclass: subclass.map(String::from),
        lon,
        lat,
        distance_from_trail_m: 120.0,
        trail_km,
        tags: None,
    }
}

fn main() {
    env_logger::init();

    // A short ridge walk east of Luxembourg City
    let geometry = RouteGeometry::from_points(vec![
        GpsPoint::new(49.6116, 6.1319),
        GpsPoint::new(49.6150, 6.1500),
        GpsPoint::new(49.6200, 6.1700),
        GpsPoint::new(49.6250, 6.1900),
    ]);

    let route = Route {
        osm_id: 42,
        name: Some("Demo Ridge Walk".to_string()),
        network: Some("lwn".to_string()),
        length_m: Some(geometry.geodesic_length_m()),
        tags: Some(HashMap::from([
            ("from".to_string(), "Pfaffenthal".to_string()),
            ("to".to_string(), "Sandweiler".to_string()),
        ])),
        ..Default::default()
    };

    let amenities = vec![
        amenity(1, "food", Some("cafe"), Some("Café Belvedere"), 0.9, 49.6130, 6.1390),
        amenity(2, "water", Some("drinking_water"), None, 1.1, 49.6140, 6.1420),
        amenity(3, "Place", Some("village"), Some("Cents"), 2.2, 49.6180, 6.1620),
        amenity(4, "resupply", Some("supermarket"), Some("Épicerie"), 2.3, 49.6185, 6.1640),
        amenity(5, "shelter", None, None, 3.6, 49.6235, 6.1850),
    ];

    let itinerary = Itinerary::assemble(route, Some(&geometry), &amenities, 0.5, &[]);
    println!(
        "{} clusters, {} amenities, {:.2} km, circular: {}",
        itinerary.clusters.len(),
        itinerary.total_amenities,
        itinerary.total_length_km,
        itinerary.is_circular
    );
    println!("Classes: {:?}\n", itinerary.available_classes);

    let user = GpsPoint::new(49.6170, 6.1580);
    let timeline = itinerary.timeline(Some(&geometry), Some(user), None);

    for (i, entry) in timeline.iter().enumerate() {
        let gap = timeline_margin_top(&timeline, i, DEFAULT_PIXELS_PER_KM);
        match &entry.user_metrics {
            Some(m) => println!(
                "{:>6.2} km  [you] {:.2} km off trail, {:.2} km to go (gap {:.0}px)",
                entry.km_from_start.unwrap_or(0.0),
                m.distance_off_trail,
                m.distance_to_end,
                gap
            ),
            None if entry.key == "user-location" => println!("{:>6.2} km  [you]", entry.trail_km),
            None => {
                let title = get_cluster_display_title(entry);
                println!(
                    "{:>6.2} km  {}{} ({} items, gap {:.0}px)",
                    entry.km_from_start.unwrap_or(0.0),
                    title.title,
                    if title.is_place_header { " *" } else { "" },
                    entry.size,
                    gap
                );
            }
        }
    }

    match create_gpx(&geometry) {
        Ok(xml) => println!("\nGPX export: {} bytes", xml.len()),
        Err(e) => eprintln!("GPX export failed: {}", e),
    }
}
