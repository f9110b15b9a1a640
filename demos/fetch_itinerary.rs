//! Load routes and one itinerary from a running trail API.
//!
//! Run with: cargo run --example fetch_itinerary --features http -- [base_url]
//!
//! The base URL defaults to the local dev proxy (http://localhost:8090).

use std::time::Instant;

use trailfox_core::routes::{display_name, formatted_length, network_label, SortOption};
use trailfox_core::titles::get_cluster_display_title;
use trailfox_core::{ClientConfig, RouteQuery, TrailApiClient};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = ClientConfig {
        developer_mode: true,
        ..Default::default()
    };
    if let Some(base) = std::env::args().nth(1) {
        config.api_base_url = base;
    }

    let client = match TrailApiClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    let start = Instant::now();
    let page = match client
        .fetch_routes(&RouteQuery {
            limit: 10,
            sort: Some(SortOption::Length),
            ..Default::default()
        })
        .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Route list failed: {}", e);
            return;
        }
    };

    println!(
        "{} routes (total {:?}) in {:?}",
        page.routes.len(),
        page.total_count,
        start.elapsed()
    );
    for route in &page.routes {
        println!(
            "  {:>10}  {:<40} {:>10}  {}",
            route.osm_id,
            display_name(route),
            formatted_length(route),
            route.network.as_deref().map(network_label).unwrap_or("")
        );
    }

    let Some(route) = page.routes.into_iter().next() else {
        return;
    };

    match client.fetch_itinerary(route, &config, &[]).await {
        Ok(loaded) => {
            println!("\nItinerary: {} clusters", loaded.itinerary.clusters.len());
            for cluster in loaded.itinerary.clusters.iter().take(15) {
                println!("  {:>7.2} km  {}", cluster.trail_km, get_cluster_display_title(cluster).title);
            }
            if loaded.geometry.is_none() {
                println!("(geometry unavailable, no live metrics)");
            }
        }
        Err(e) => eprintln!("Itinerary failed: {}", e),
    }
}
