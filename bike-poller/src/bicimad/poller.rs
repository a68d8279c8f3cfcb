//! Change-detecting station poller.
//!
//! Each poll fetches the full station list through the session and
//! fingerprints the raw `data` array. Only a fingerprint different from the
//! previous poll's produces a [`StationSnapshot`]; the response timestamp is
//! not part of the fingerprint, so a refreshed `datetime` alone is not a
//! change.

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::fingerprint::Fingerprint;
use crate::polling::SnapshotSource;
use crate::transport::Transport;

use super::config::BiciMadConfig;
use super::error::BiciMadError;
use super::session::{AuthorizedRequest, SessionManager};
use super::types::{RawStation, StationsResponse};

/// Keys `Station` writes itself; pass-through fields with these names are dropped.
const NORMALIZED_KEYS: [&str; 3] = ["lat", "lon", "datetime"];

/// A station with its position flattened and the fetch time attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: u64,
    pub number: String,
    pub activate: u8,
    pub total_bases: u32,
    pub dock_bikes: u32,
    pub free_bases: u32,
    pub reservations_count: u32,
    pub lat: f64,
    pub lon: f64,
    /// Server-reported time of the list this station came from.
    pub datetime: NaiveDateTime,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Station {
    fn from_raw(raw: RawStation, datetime: NaiveDateTime) -> Self {
        let [lon, lat] = raw.geometry.coordinates;
        let mut extra = raw.extra;
        for key in NORMALIZED_KEYS {
            extra.remove(key);
        }
        Self {
            id: raw.id,
            number: raw.number,
            activate: raw.activate,
            total_bases: raw.total_bases,
            dock_bikes: raw.dock_bikes,
            free_bases: raw.free_bases,
            reservations_count: raw.reservations_count,
            lat,
            lon,
            datetime,
            extra,
        }
    }

    pub fn is_active(&self) -> bool {
        self.activate == 1
    }
}

/// One changed station list.
#[derive(Debug, Clone, Serialize)]
pub struct StationSnapshot {
    datetime: NaiveDateTime,
    fingerprint: Fingerprint,
    stations: Vec<Station>,
}

impl StationSnapshot {
    fn from_response(
        resp: StationsResponse,
        fingerprint: Fingerprint,
    ) -> Result<Self, BiciMadError> {
        let datetime = parse_datetime(&resp.datetime)?;
        let stations = resp
            .data
            .into_iter()
            .map(|raw| Station::from_raw(raw, datetime))
            .collect();

        Ok(Self {
            datetime,
            fingerprint,
            stations,
        })
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

}

/// Parse the provider's `datetime`, dropping sub-second precision.
///
/// The API sends `YYYY-MM-DDTHH:MM:SS.ffffff`.
fn parse_datetime(raw: &str) -> Result<NaiveDateTime, BiciMadError> {
    let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| BiciMadError::Payload {
            message: format!("invalid datetime {raw:?}: {e}"),
        })?;
    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

/// Polls the station list and reports only changes.
#[derive(Debug, Clone)]
pub struct StationPoller {
    request: AuthorizedRequest,
    last: Option<Fingerprint>,
}

impl StationPoller {
    pub fn new(config: &BiciMadConfig) -> Self {
        Self {
            request: AuthorizedRequest::ok_coded(config.stations_url()),
            last: None,
        }
    }

    /// Fingerprint of the last forwarded snapshot.
    pub fn last_fingerprint(&self) -> Option<&Fingerprint> {
        self.last.as_ref()
    }

    /// Fetch the station list once.
    ///
    /// Returns `None` when the data is identical to the previous poll.
    pub async fn poll_once<T: Transport>(
        &mut self,
        session: &mut SessionManager<T>,
    ) -> Result<Option<StationSnapshot>, BiciMadError> {
        let body = session.authorized_call(&self.request).await?;

        let data = body.get("data").ok_or_else(|| BiciMadError::Payload {
            message: "station list has no data".to_string(),
        })?;
        let fingerprint = Fingerprint::of(data);

        if self.last.as_ref() == Some(&fingerprint) {
            debug!(%fingerprint, "station data unchanged");
            return Ok(None);
        }

        let resp: StationsResponse = serde_json::from_value(body).map_err(BiciMadError::payload)?;
        let snapshot = StationSnapshot::from_response(resp, fingerprint.clone())?;

        info!(
            %fingerprint,
            stations = snapshot.stations.len(),
            datetime = %snapshot.datetime,
            "station data changed"
        );
        self.last = Some(fingerprint);
        Ok(Some(snapshot))
    }
}

/// A session paired with its poller, driven by the polling loop.
pub struct BiciMadFeed<T> {
    session: SessionManager<T>,
    poller: StationPoller,
}

impl<T: Transport> BiciMadFeed<T> {
    pub fn new(session: SessionManager<T>) -> Self {
        let poller = StationPoller::new(session.config());
        Self { session, poller }
    }

    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }
}

impl<T: Transport> SnapshotSource for BiciMadFeed<T> {
    type Snapshot = StationSnapshot;
    type Error = BiciMadError;

    async fn next_snapshot(&mut self) -> Result<Option<StationSnapshot>, BiciMadError> {
        self.poller.poll_once(&mut self.session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bicimad::config::Credentials;
    use crate::bicimad::token::{AccessToken, TokenStore};
    use crate::transport::mock::ScriptedTransport;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn config() -> BiciMadConfig {
        BiciMadConfig::new(Credentials::user("me@example.com", "pw")).with_base_url("http://emt.test")
    }

    /// Session with a cached token that `whoami` will accept.
    fn live_session(dir: &TempDir) -> SessionManager<ScriptedTransport> {
        let store = TokenStore::new(dir.path().join("token.txt"));
        store.save(&AccessToken::new("live").unwrap()).unwrap();
        let session = SessionManager::new(ScriptedTransport::new(), config(), store);
        session
            .transport()
            .push_json(&config().whoami_url(), json!({"code": "02"}));
        session
    }

    fn station(id: u64, dock_bikes: u32, lon: f64, lat: f64) -> Value {
        json!({
            "id": id,
            "number": format!("{id}a"),
            "activate": 1,
            "total_bases": 24,
            "dock_bikes": dock_bikes,
            "free_bases": 24 - dock_bikes,
            "reservations_count": 0,
            "name": format!("Station {id}"),
            "geometry": {"type": "Point", "coordinates": [lon, lat]}
        })
    }

    fn stations_body(datetime: &str, data: Vec<Value>) -> Value {
        json!({"code": "00", "datetime": datetime, "data": data})
    }

    #[test]
    fn datetime_drops_fraction() {
        let dt = parse_datetime("2024-03-15T10:20:30.541000").unwrap();
        assert_eq!(dt.to_string(), "2024-03-15 10:20:30");

        let dt = parse_datetime("2024-03-15T10:20:30").unwrap();
        assert_eq!(dt.to_string(), "2024-03-15 10:20:30");

        assert!(parse_datetime("yesterday").is_err());
    }

    #[tokio::test]
    async fn normalizes_geometry_into_lat_lon() {
        let dir = tempdir().unwrap();
        let mut session = live_session(&dir);
        session.transport().push_json(
            &config().stations_url(),
            stations_body("2024-03-15T10:00:00.123456", vec![station(7, 5, 2.17, 41.38)]),
        );
        let mut poller = StationPoller::new(&config());

        let snapshot = poller.poll_once(&mut session).await.unwrap().unwrap();

        let s = &snapshot.stations()[0];
        assert_eq!(s.lon, 2.17);
        assert_eq!(s.lat, 41.38);
        assert_eq!(s.id, 7);
        assert_eq!(s.dock_bikes, 5);
        assert!(s.is_active());
        assert_eq!(s.datetime.to_string(), "2024-03-15 10:00:00");

        let out = serde_json::to_value(s).unwrap();
        assert!(out.get("geometry").is_none());
        assert_eq!(out["lon"], 2.17);
        assert_eq!(out["lat"], 41.38);
        assert_eq!(out["name"], "Station 7");
        assert_eq!(out["datetime"], "2024-03-15T10:00:00");
    }

    #[tokio::test]
    async fn identical_payload_is_not_forwarded_twice() {
        let dir = tempdir().unwrap();
        let mut session = live_session(&dir);
        let url = config().stations_url();
        let data = vec![station(1, 3, -3.70, 40.41), station(2, 8, -3.69, 40.42)];
        session
            .transport()
            .push_json(&url, stations_body("2024-03-15T10:00:00.1", data.clone()));
        // Only the timestamp moves
        session
            .transport()
            .push_json(&url, stations_body("2024-03-15T10:00:10.1", data));
        let mut poller = StationPoller::new(&config());

        let first = poller.poll_once(&mut session).await.unwrap();
        let second = poller.poll_once(&mut session).await.unwrap();

        let first = first.unwrap();
        assert_eq!(first.stations().len(), 2);
        assert_eq!(poller.last_fingerprint(), Some(first.fingerprint()));
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn changed_payload_is_forwarded() {
        let dir = tempdir().unwrap();
        let mut session = live_session(&dir);
        let url = config().stations_url();
        session.transport().push_json(
            &url,
            stations_body("2024-03-15T10:00:00.1", vec![station(1, 3, -3.70, 40.41)]),
        );
        session.transport().push_json(
            &url,
            stations_body("2024-03-15T10:00:10.1", vec![station(1, 4, -3.70, 40.41)]),
        );
        let mut poller = StationPoller::new(&config());

        let first = poller.poll_once(&mut session).await.unwrap().unwrap();
        let second = poller.poll_once(&mut session).await.unwrap().unwrap();

        assert_ne!(first.fingerprint(), second.fingerprint());
        assert_eq!(second.stations()[0].dock_bikes, 4);
    }

    #[tokio::test]
    async fn payload_level_rejection_refreshes_token() {
        let dir = tempdir().unwrap();
        let mut session = live_session(&dir);
        let url = config().stations_url();
        session.transport().push_json(&url, json!({"code": "80", "description": "invalid token"}));
        session.transport().push_json(
            &config().login_url(),
            json!({"code": "00", "data": [{"accessToken": "renewed"}]}),
        );
        session.transport().push_json(
            &url,
            stations_body("2024-03-15T10:00:00.1", vec![station(1, 3, -3.70, 40.41)]),
        );
        let mut poller = StationPoller::new(&config());

        let snapshot = poller.poll_once(&mut session).await.unwrap();

        assert!(snapshot.is_some());
        let calls = session.transport().calls_to(&url);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].header("accessToken"), Some("renewed"));
    }

    #[tokio::test]
    async fn malformed_payload_does_not_advance_fingerprint() {
        let dir = tempdir().unwrap();
        let mut session = live_session(&dir);
        session.transport().push_json(
            &config().stations_url(),
            json!({"code": "00", "datetime": "garbage", "data": [station(1, 3, 0.0, 0.0)]}),
        );
        let mut poller = StationPoller::new(&config());

        let result = poller.poll_once(&mut session).await;

        assert!(matches!(result, Err(BiciMadError::Payload { .. })));
        assert!(poller.last_fingerprint().is_none());
    }

    #[tokio::test]
    async fn feed_drives_session_and_poller() {
        let dir = tempdir().unwrap();
        let session = live_session(&dir);
        session.transport().push_json(
            &config().stations_url(),
            stations_body("2024-03-15T10:00:00.1", vec![station(1, 3, -3.70, 40.41)]),
        );
        let mut feed = BiciMadFeed::new(session);

        let snapshot = feed.next_snapshot().await.unwrap();

        assert!(snapshot.is_some());
        assert_eq!(
            feed.session().current_token(),
            Some(&AccessToken::new("live").unwrap())
        );
    }

    #[test]
    fn pass_through_fields_cannot_shadow_normalized_ones() {
        let mut raw = station(3, 2, -3.70, 40.41);
        raw["lat"] = json!("stale");
        raw["lon"] = json!(0);
        raw["datetime"] = json!("2020-01-01");
        let raw: RawStation = serde_json::from_value(raw).unwrap();
        let datetime = parse_datetime("2024-03-15T10:00:00").unwrap();

        let station = Station::from_raw(raw, datetime);
        assert!(station.extra.get("lat").is_none());
        assert!(station.extra.get("lon").is_none());
        assert!(station.extra.get("datetime").is_none());

        let out = serde_json::to_string(&station).unwrap();
        assert_eq!(out.matches("\"lat\"").count(), 1);
        assert_eq!(out.matches("\"lon\"").count(), 1);
        assert_eq!(out.matches("\"datetime\"").count(), 1);

        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["lat"], 40.41);
        assert_eq!(out["lon"], -3.70);
        assert_eq!(out["datetime"], "2024-03-15T10:00:00");
        assert_eq!(out["name"], "Station 3");
    }
}
