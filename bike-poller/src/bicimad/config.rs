//! BiciMAD (EMT Madrid) client configuration.

use std::time::Duration;

/// Default base URL for the EMT Madrid open API.
pub const DEFAULT_BASE_URL: &str = "https://openapi.emtmadrid.es/v1";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Login credentials for the EMT API.
///
/// The login endpoint accepts either an application key pair or a
/// registered user's email and password, both sent as headers.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `X-ClientId` / `passKey` headers
    ApiKey { client_id: String, pass_key: String },
    /// `email` / `password` headers
    User { email: String, password: String },
}

impl Credentials {
    pub fn api_key(client_id: impl Into<String>, pass_key: impl Into<String>) -> Self {
        Self::ApiKey {
            client_id: client_id.into(),
            pass_key: pass_key.into(),
        }
    }

    pub fn user(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::User {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Headers to send on the login call.
    pub fn headers(&self) -> [(&str, &str); 2] {
        match self {
            Credentials::ApiKey {
                client_id,
                pass_key,
            } => [("X-ClientId", client_id.as_str()), ("passKey", pass_key.as_str())],
            Credentials::User { email, password } => {
                [("email", email.as_str()), ("password", password.as_str())]
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey { client_id, .. } => f
                .debug_struct("ApiKey")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::User { email, .. } => f
                .debug_struct("User")
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

/// Configuration for the BiciMAD session and station endpoints.
#[derive(Debug, Clone)]
pub struct BiciMadConfig {
    /// Login credentials
    pub credentials: Credentials,
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl BiciMadConfig {
    /// Create a new config with the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn login_url(&self) -> String {
        format!("{}/mobilitylabs/user/login/", self.base_url)
    }

    pub fn logout_url(&self) -> String {
        format!("{}/mobilitylabs/user/logout/", self.base_url)
    }

    pub fn whoami_url(&self) -> String {
        format!("{}/mobilitylabs/user/whoami/", self.base_url)
    }

    pub fn stations_url(&self) -> String {
        format!("{}/transport/bicimad/stations/", self.base_url)
    }
}
