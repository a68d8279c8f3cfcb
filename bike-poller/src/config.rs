//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::bicimad::{BiciMadConfig, Credentials, DEFAULT_TOKEN_PATH};
use crate::bicing::BicingConfig;
use crate::collector::DEFAULT_OUTPUT_PATH;
use crate::polling::PollSchedule;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    /// A variable is set but can't be parsed
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which provider to poll.
#[derive(Debug, Clone)]
pub enum Provider {
    BiciMad(BiciMadConfig),
    Bicing(BicingConfig),
}

/// Everything the binary needs to run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: Provider,
    /// Token slot for the authenticated provider
    pub token_path: PathBuf,
    /// Where collected snapshots are written
    pub output_path: PathBuf,
    pub schedule: PollSchedule,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = Duration::from_secs(parse_or(&var, "HTTP_TIMEOUT_SECS", 3)?);

        let provider = match var("PROVIDER").as_deref() {
            None | Some("bicimad") => {
                let mut config = BiciMadConfig::new(credentials(&var)?).with_timeout(timeout);
                if let Some(url) = var("BICIMAD_BASE_URL") {
                    config = config.with_base_url(url);
                }
                Provider::BiciMad(config)
            }
            Some("bicing") => {
                let mut config = BicingConfig::new().with_timeout(timeout);
                if let Some(url) = var("BICING_URL") {
                    config = config.with_url(url);
                }
                Provider::Bicing(config)
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "PROVIDER",
                    value: other.to_string(),
                });
            }
        };

        let iterations = match parse_or(&var, "POLL_ITERATIONS", 100)? {
            0 => None,
            n => Some(n),
        };
        let interval_secs: u64 = parse_or(&var, "POLL_INTERVAL_SECS", 10)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                value: interval_secs.to_string(),
            });
        }
        let schedule = PollSchedule::new(Duration::from_secs(interval_secs))
            .with_iterations(iterations)
            .with_stop_on_error(parse_or(&var, "POLL_STOP_ON_ERROR", false)?);

        Ok(Self {
            provider,
            token_path: var("BICIMAD_TOKEN_PATH")
                .unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string())
                .into(),
            output_path: var("SNAPSHOT_OUTPUT")
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string())
                .into(),
            schedule,
        })
    }
}

fn credentials(var: &impl Fn(&str) -> Option<String>) -> Result<Credentials, ConfigError> {
    if let Some(client_id) = var("BICIMAD_CLIENT_ID") {
        let pass_key = var("BICIMAD_PASS_KEY").ok_or(ConfigError::Missing("BICIMAD_PASS_KEY"))?;
        return Ok(Credentials::api_key(client_id, pass_key));
    }
    if let Some(email) = var("BICIMAD_EMAIL") {
        let password = var("BICIMAD_PASSWORD").ok_or(ConfigError::Missing("BICIMAD_PASSWORD"))?;
        return Ok(Credentials::user(email, password));
    }
    Err(ConfigError::Missing("BICIMAD_CLIENT_ID"))
}

fn parse_or<V: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: V,
) -> Result<V, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_with_api_key() {
        let config = load(&[("BICIMAD_CLIENT_ID", "id"), ("BICIMAD_PASS_KEY", "key")]).unwrap();

        let Provider::BiciMad(bicimad) = &config.provider else {
            panic!("expected bicimad provider");
        };
        assert_eq!(bicimad.credentials, Credentials::api_key("id", "key"));
        assert_eq!(bicimad.timeout, Duration::from_secs(3));
        assert_eq!(config.token_path, PathBuf::from("access_token.txt"));
        assert_eq!(config.output_path, PathBuf::from("data.jsonl"));
        assert_eq!(config.schedule, PollSchedule::default());
    }

    #[test]
    fn user_credentials_and_overrides() {
        let config = load(&[
            ("BICIMAD_EMAIL", "me@example.com"),
            ("BICIMAD_PASSWORD", "pw"),
            ("BICIMAD_BASE_URL", "http://localhost:9000"),
            ("POLL_INTERVAL_SECS", "5"),
            ("POLL_ITERATIONS", "0"),
            ("POLL_STOP_ON_ERROR", "true"),
            ("HTTP_TIMEOUT_SECS", "7"),
        ])
        .unwrap();

        let Provider::BiciMad(bicimad) = &config.provider else {
            panic!("expected bicimad provider");
        };
        assert_eq!(bicimad.credentials, Credentials::user("me@example.com", "pw"));
        assert_eq!(bicimad.base_url, "http://localhost:9000");
        assert_eq!(bicimad.timeout, Duration::from_secs(7));
        assert_eq!(config.schedule.interval, Duration::from_secs(5));
        assert_eq!(config.schedule.iterations, None);
        assert!(config.schedule.stop_on_error);
    }

    #[test]
    fn missing_credentials() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("BICIMAD_CLIENT_ID"))));
        assert!(matches!(
            load(&[("BICIMAD_CLIENT_ID", "id")]),
            Err(ConfigError::Missing("BICIMAD_PASS_KEY"))
        ));
    }

    #[test]
    fn bicing_needs_no_credentials() {
        let config = load(&[("PROVIDER", "bicing")]).unwrap();
        assert!(matches!(config.provider, Provider::Bicing(_)));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[("PROVIDER", "bicing"), ("POLL_INTERVAL_SECS", "soon")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for POLL_INTERVAL_SECS: \"soon\"");

        let err = load(&[("PROVIDER", "bicing"), ("POLL_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "POLL_INTERVAL_SECS", ref value } if value == "0"
        ));

        assert!(matches!(
            load(&[("PROVIDER", "velib")]),
            Err(ConfigError::Invalid { name: "PROVIDER", .. })
        ));
    }
}
