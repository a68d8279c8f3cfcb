//! EMT Madrid API response DTOs.
//!
//! Every EMT response carries a two-character `code`. Its meaning depends on
//! the endpoint, so the constants below are named for the endpoint that
//! uses them.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Login granted; station list served.
pub const CODE_OK: &str = "00";

/// Login refused because a session is already open for these credentials.
pub const CODE_ALREADY_LOGGED_IN: &str = "01";

/// `whoami` answered for a live token.
pub const CODE_TOKEN_ALIVE: &str = "02";

/// Response from the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data: Vec<LoginData>,
}

/// Entry of the login `data` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: Option<String>,
}

impl LoginResponse {
    /// The granted token, if the payload carries one.
    pub fn access_token(&self) -> Option<&str> {
        self.data
            .first()
            .and_then(|d| d.access_token.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Token of the session that is already open.
    ///
    /// With code `01` the provider does not return the old token in `data`;
    /// it is the second whitespace-separated word of `description`.
    pub fn previous_token(&self) -> Option<&str> {
        self.description.split_whitespace().nth(1)
    }
}

/// Any response where only the status code matters (`whoami`, `logout`).
#[derive(Debug, Clone, Deserialize)]
pub struct CodeResponse {
    pub code: String,
}

/// Response from the station list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StationsResponse {
    pub code: String,
    pub datetime: String,
    pub data: Vec<RawStation>,
}

/// One station as served by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStation {
    pub id: u64,
    pub number: String,
    pub activate: u8,
    pub total_bases: u32,
    pub dock_bikes: u32,
    pub free_bases: u32,
    pub reservations_count: u32,
    pub geometry: Geometry,
    /// Fields we pass through untouched (name, address, light, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// GeoJSON point.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}
