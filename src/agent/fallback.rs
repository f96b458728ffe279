use crate::graph::nodes::{extract_city, mentions_weather};

pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Same keyword test the offline decide step uses.
pub fn is_weather_query(query: &str) -> bool {
    mentions_weather(query)
}

pub fn fallback_city(query: &str) -> String {
    extract_city(query).unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}
