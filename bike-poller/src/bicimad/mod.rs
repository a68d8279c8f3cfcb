//! BiciMAD (EMT Madrid) client.
//!
//! The EMT open API needs an access token on every call. Tokens are issued
//! by a login endpoint, expire server-side without notice, and only one can
//! be open per set of credentials. This module keeps one live token across
//! restarts and polls the station list on top of it:
//!
//! - [`TokenStore`] caches the token in a plain-text file
//! - [`SessionManager`] validates, acquires and refreshes it
//! - [`StationPoller`] fetches stations and forwards only changes

mod config;
mod error;
mod poller;
mod session;
mod token;
mod types;

pub use config::{BiciMadConfig, Credentials, DEFAULT_BASE_URL};
pub use error::BiciMadError;
pub use poller::{BiciMadFeed, Station, StationPoller, StationSnapshot};
pub use session::{AuthorizedRequest, SessionManager};
pub use token::{AccessToken, DEFAULT_TOKEN_PATH, TokenStore};
pub use types::{
    CODE_ALREADY_LOGGED_IN, CODE_OK, CODE_TOKEN_ALIVE, CodeResponse, LoginResponse, RawStation,
    StationsResponse,
};
