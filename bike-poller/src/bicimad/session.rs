//! Authenticated session lifecycle for the EMT API.
//!
//! [`SessionManager`] owns the current access token and guarantees that every
//! authorized call carries a live one:
//!
//! - On start the cached token is read from the [`TokenStore`] and checked
//!   with `whoami`; a dead or missing token triggers a login.
//! - Login may report that a session is already open. The stale token is
//!   logged out and the login retried once.
//! - A call rejected for its token triggers one re-login and one retry.
//!
//! Both recoveries are bounded loops over tagged outcomes, so a misbehaving
//! provider produces an error instead of unbounded retries.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError};

use super::config::BiciMadConfig;
use super::error::BiciMadError;
use super::token::{AccessToken, TokenStore};
use super::types::{CODE_ALREADY_LOGGED_IN, CODE_OK, CODE_TOKEN_ALIVE, CodeResponse, LoginResponse};

/// Header carrying the token on authorized calls.
const ACCESS_TOKEN_HEADER: &str = "accessToken";

/// Login attempts per acquisition: the first, plus one after a forced logout.
const MAX_LOGIN_ATTEMPTS: usize = 2;

/// Attempts per authorized call: the first, plus one after re-login.
const MAX_CALL_ATTEMPTS: usize = 2;

/// Token state held by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenState {
    /// Nothing usable in hand; the next call loads or acquires one.
    NoToken,
    /// Validated by `whoami` or freshly issued by login.
    Live(AccessToken),
}

/// An authorized GET and the payload code that means it succeeded.
///
/// The EMT API reports token problems inside 200-status bodies, so any other
/// code is read as a rejected token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedRequest {
    pub url: String,
    pub success_code: &'static str,
}

impl AuthorizedRequest {
    pub fn new(url: impl Into<String>, success_code: &'static str) -> Self {
        Self {
            url: url.into(),
            success_code,
        }
    }

    /// A request whose success code is `00`.
    pub fn ok_coded(url: impl Into<String>) -> Self {
        Self::new(url, CODE_OK)
    }
}

/// Result of one login call.
enum LoginOutcome {
    Granted(AccessToken),
    AlreadyLoggedIn {
        previous: Option<AccessToken>,
        description: String,
    },
    Refused {
        code: String,
        description: String,
    },
}

/// Result of one authorized attempt.
enum CallOutcome {
    Accepted(Value),
    TokenRejected { code: String },
}

/// Owns the access token for one set of credentials.
pub struct SessionManager<T> {
    transport: T,
    config: BiciMadConfig,
    store: TokenStore,
    state: TokenState,
}

impl<T: Transport> SessionManager<T> {
    /// Create a session. No network call is made until a token is needed.
    pub fn new(transport: T, config: BiciMadConfig, store: TokenStore) -> Self {
        Self {
            transport,
            config,
            store,
            state: TokenState::NoToken,
        }
    }

    /// The live token, if one is held.
    pub fn current_token(&self) -> Option<&AccessToken> {
        match &self.state {
            TokenState::Live(token) => Some(token),
            TokenState::NoToken => None,
        }
    }

    pub fn config(&self) -> &BiciMadConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Establish a live token, reusing the cached one when `whoami` accepts it.
    pub async fn load_or_init_token(&mut self) -> Result<AccessToken, BiciMadError> {
        let Some(token) = self.store.load() else {
            info!("no cached access token, logging in");
            return self.acquire().await;
        };

        if !self.is_live(&token).await {
            info!("cached access token is no longer valid, logging in");
            return self.acquire().await;
        }

        debug!(?token, "cached access token is live");
        self.store.save(&token)?;
        self.state = TokenState::Live(token.clone());
        Ok(token)
    }

    /// Ask the provider whether `token` is still accepted.
    ///
    /// Fails closed: any transport or decoding problem counts as dead.
    pub async fn is_live(&self, token: &AccessToken) -> bool {
        let result = self
            .transport
            .get_json(
                &self.config.whoami_url(),
                &[(ACCESS_TOKEN_HEADER, token.as_str())],
                self.config.timeout,
            )
            .await;

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "identity check failed, treating token as dead");
                return false;
            }
        };

        match serde_json::from_value::<CodeResponse>(body) {
            Ok(resp) => resp.code == CODE_TOKEN_ALIVE,
            Err(e) => {
                warn!(error = %e, "unreadable identity check response");
                false
            }
        }
    }

    /// Log in and persist the issued token.
    ///
    /// An "already logged in" answer is handled by logging out the previous
    /// token and trying once more.
    pub async fn acquire(&mut self) -> Result<AccessToken, BiciMadError> {
        self.state = TokenState::NoToken;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.login().await? {
                LoginOutcome::Granted(token) => {
                    self.store.save(&token)?;
                    info!(attempts, ?token, "acquired access token");
                    self.state = TokenState::Live(token.clone());
                    return Ok(token);
                }
                LoginOutcome::AlreadyLoggedIn {
                    previous,
                    description,
                } => {
                    let previous = match previous {
                        Some(token) if attempts < MAX_LOGIN_ATTEMPTS => token,
                        _ => {
                            return Err(BiciMadError::AcquisitionFailure {
                                code: CODE_ALREADY_LOGGED_IN.to_string(),
                                description,
                            });
                        }
                    };
                    warn!(?previous, "session already open, forcing logout");
                    self.logout(&previous).await;
                }
                LoginOutcome::Refused { code, description } => {
                    return Err(BiciMadError::AcquisitionFailure { code, description });
                }
            }
        }
    }

    /// End the session for `token`. Best effort: failures are only logged.
    pub async fn logout(&self, token: &AccessToken) {
        let result = self
            .transport
            .get_json(
                &self.config.logout_url(),
                &[(ACCESS_TOKEN_HEADER, token.as_str())],
                self.config.timeout,
            )
            .await;

        if let Err(e) = result {
            warn!(error = %e, "logout failed, continuing");
        }
    }

    /// Issue `request` with a live token attached.
    ///
    /// If the provider rejects the token, a new one is acquired and the
    /// request is retried once. A second rejection is returned as
    /// [`BiciMadError::TokenInvalid`].
    pub async fn authorized_call(
        &mut self,
        request: &AuthorizedRequest,
    ) -> Result<Value, BiciMadError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let token = self.ensure_token().await?;

            match self.attempt(request, &token).await? {
                CallOutcome::Accepted(body) => return Ok(body),
                CallOutcome::TokenRejected { code } => {
                    self.state = TokenState::NoToken;
                    if attempts >= MAX_CALL_ATTEMPTS {
                        return Err(BiciMadError::TokenInvalid { code });
                    }
                    warn!(%code, url = %request.url, "access token rejected, logging in again");
                    self.acquire().await?;
                }
            }
        }
    }

    async fn ensure_token(&mut self) -> Result<AccessToken, BiciMadError> {
        match &self.state {
            TokenState::Live(token) => Ok(token.clone()),
            TokenState::NoToken => self.load_or_init_token().await,
        }
    }

    async fn login(&self) -> Result<LoginOutcome, BiciMadError> {
        let body = self
            .transport
            .get_json(
                &self.config.login_url(),
                &self.config.credentials.headers(),
                self.config.timeout,
            )
            .await?;
        let resp: LoginResponse = serde_json::from_value(body).map_err(BiciMadError::payload)?;

        match resp.code.as_str() {
            CODE_OK => {
                let token = resp
                    .access_token()
                    .and_then(AccessToken::new)
                    .ok_or_else(|| BiciMadError::Payload {
                        message: "login succeeded without an access token".to_string(),
                    })?;
                Ok(LoginOutcome::Granted(token))
            }
            CODE_ALREADY_LOGGED_IN => Ok(LoginOutcome::AlreadyLoggedIn {
                previous: resp.previous_token().and_then(AccessToken::new),
                description: resp.description,
            }),
            _ => Ok(LoginOutcome::Refused {
                code: resp.code,
                description: resp.description,
            }),
        }
    }

    async fn attempt(
        &self,
        request: &AuthorizedRequest,
        token: &AccessToken,
    ) -> Result<CallOutcome, BiciMadError> {
        let result = self
            .transport
            .get_json(
                &request.url,
                &[(ACCESS_TOKEN_HEADER, token.as_str())],
                self.config.timeout,
            )
            .await;

        let body = match result {
            Ok(body) => body,
            Err(TransportError::Unauthorized { status }) => {
                return Ok(CallOutcome::TokenRejected {
                    code: status.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let code = body
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| BiciMadError::Payload {
                message: format!("response from {} has no code", request.url),
            })?;

        if code == request.success_code {
            Ok(CallOutcome::Accepted(body))
        } else {
            Ok(CallOutcome::TokenRejected {
                code: code.to_string(),
            })
        }
    }
}
