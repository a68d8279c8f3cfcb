//! Bicing station feed DTOs.
//!
//! The feed sends every field as a string, but older snapshots carry bare
//! numbers for some of them, so fields accept either.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Top-level feed response.
#[derive(Debug, Clone, Deserialize)]
pub struct StationsFeed {
    pub stations: Vec<BicingStation>,
}

/// One station in the Bicing feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BicingStation {
    #[serde(default, deserialize_with = "stringish")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "stringish")]
    pub kind: String,
    #[serde(default, deserialize_with = "stringish")]
    pub latitude: String,
    #[serde(default, deserialize_with = "stringish")]
    pub longitude: String,
    #[serde(default, deserialize_with = "stringish")]
    pub street_name: String,
    #[serde(default, deserialize_with = "stringish")]
    pub street_number: String,
    #[serde(default, deserialize_with = "stringish")]
    pub altitude: String,
    #[serde(default, deserialize_with = "stringish")]
    pub slots: String,
    #[serde(default, deserialize_with = "stringish")]
    pub bikes: String,
    /// Comma-separated ids of neighbouring stations.
    #[serde(default, deserialize_with = "stringish")]
    pub nearby_stations: String,
    /// `OPN` or `CLS`
    #[serde(default, deserialize_with = "stringish")]
    pub status: String,
}

impl BicingStation {
    /// `(latitude, longitude)`, if both parse.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude.parse().ok()?, self.longitude.parse().ok()?))
    }

    pub fn bikes(&self) -> Option<u32> {
        self.bikes.parse().ok()
    }

    pub fn slots(&self) -> Option<u32> {
        self.slots.parse().ok()
    }

    pub fn is_open(&self) -> bool {
        self.status == "OPN"
    }

    pub fn nearby(&self) -> impl Iterator<Item = &str> {
        self.nearby_stations
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn stringish<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
