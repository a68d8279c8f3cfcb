//! Scripted transport for exercising provider logic without network access.
//!
//! Responses are queued per URL and served in order. Every call is recorded
//! so tests can assert on how many requests were made and with which
//! headers.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use super::error::TransportError;
use super::{Header, Transport};

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedCall {
    /// Value of the named header, if it was sent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Transport that replays queued responses.
///
/// A URL with nothing left in its queue answers with a 404 API error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON body for the next GET of `url`.
    pub fn push_json(&self, url: &str, body: Value) {
        self.push(url, Ok(body));
    }

    /// Queue a failure for the next GET of `url`.
    pub fn push_error(&self, url: &str, err: TransportError) {
        self.push(url, Err(err));
    }

    fn push(&self, url: &str, response: Result<Value, TransportError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// All calls made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Calls made to `url`.
    pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    /// Number of queued responses not yet consumed, across all URLs.
    pub fn pending(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(VecDeque::len)
            .sum()
    }
}

impl Transport for ScriptedTransport {
    async fn get_json(
        &self,
        url: &str,
        headers: &[Header<'_>],
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
                    .collect(),
            });

        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(url)
            .and_then(VecDeque::pop_front);

        next.unwrap_or_else(|| {
            Err(TransportError::Api {
                status: 404,
                message: format!("no scripted response for {url}"),
            })
        })
    }
}
