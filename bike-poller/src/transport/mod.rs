//! HTTP transport seam.
//!
//! Everything above this module talks to providers through [`Transport`]:
//! a GET with headers and a timeout that yields decoded JSON, or fails on a
//! non-success status. The production implementation wraps `reqwest`;
//! [`mock::ScriptedTransport`] replays canned responses for tests.

mod error;
mod http;
pub mod mock;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

pub use error::TransportError;
pub use http::HttpTransport;

/// A header to send with a request, as `(name, value)`.
pub type Header<'a> = (&'a str, &'a str);

/// Performs HTTP GETs returning JSON.
pub trait Transport {
    /// GET `url` with the given headers, failing after `timeout`.
    ///
    /// Non-2xx responses are errors; 401 and 403 map to
    /// [`TransportError::Unauthorized`].
    fn get_json(
        &self,
        url: &str,
        headers: &[Header<'_>],
        timeout: Duration,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}
