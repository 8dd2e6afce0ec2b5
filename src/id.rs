//! ID generation utilities for Routebook
//!
//! Provides functions for generating unique identifiers for stops and routes.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn generate_id(prefix: &str) -> String {
    let random: u64 = rand::rng().random();
    format!("{}-{}-{:016x}", prefix, now_ms(), random)
}

/// Generate a unique stop ID
///
/// Format: `stop-{timestamp_ms}-{random_hex}`
/// Example: `stop-1738300800123-9f3c5e21a1b2d4e7`
pub fn generate_stop_id() -> String {
    generate_id("stop")
}

/// Generate a unique route ID
///
/// Format: `route-{timestamp_ms}-{random_hex}`
pub fn generate_route_id() -> String {
    generate_id("route")
}
