//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use cleanops_auth::cipher::KEY_LEN;
use cleanops_auth::{KeyLengthError, TokenConfig, TokenConfigError, DEFAULT_TTL_SECS, MAX_TTL_SECS};

pub const ENV_BIND_ADDR: &str = "CLEANOPS_BIND_ADDR";
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
pub const ENV_PAYLOAD_KEY: &str = "PAYLOAD_ENCRYPTION_KEY";
pub const ENV_TTL_SECS: &str = "JWT_TTL_SECS";
pub const ENV_BOOTSTRAP_ADMIN_EMAIL: &str = "CLEANOPS_BOOTSTRAP_ADMIN_EMAIL";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error(transparent)]
    Token(#[from] TokenConfigError),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub token: TokenConfig,
    /// When set, the binary seeds an admin with this email and prints a token for it.
    pub bootstrap_admin_email: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Secrets are validated here so a bad deployment fails before binding a port.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup(ENV_BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: ENV_BIND_ADDR,
                reason: e.to_string(),
            })?;

        let signing_secret = lookup(ENV_JWT_SECRET)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(ENV_JWT_SECRET))?
            .into_bytes();

        let payload_key = lookup(ENV_PAYLOAD_KEY)
            .ok_or(ConfigError::Missing(ENV_PAYLOAD_KEY))?
            .into_bytes();
        if payload_key.len() != KEY_LEN {
            return Err(TokenConfigError::KeyLength(KeyLengthError {
                expected: KEY_LEN,
                actual: payload_key.len(),
            })
            .into());
        }

        if signing_secret == payload_key {
            tracing::warn!("{ENV_JWT_SECRET} and {ENV_PAYLOAD_KEY} are identical; provision distinct secrets");
        }

        let ttl_secs = match lookup(ENV_TTL_SECS) {
            Some(raw) => raw.parse::<i64>().map_err(|e| ConfigError::Invalid {
                var: ENV_TTL_SECS,
                reason: e.to_string(),
            })?,
            None => DEFAULT_TTL_SECS,
        };
        if ttl_secs <= 0 {
            return Err(TokenConfigError::NonPositiveTtl(ttl_secs).into());
        }
        if ttl_secs > MAX_TTL_SECS {
            return Err(TokenConfigError::TtlTooLong(ttl_secs).into());
        }
        let ttl = Duration::try_seconds(ttl_secs).ok_or(TokenConfigError::TtlTooLong(ttl_secs))?;

        Ok(Self {
            bind_addr,
            token: TokenConfig {
                signing_secret,
                payload_key,
                ttl,
            },
            bootstrap_admin_email: lookup(ENV_BOOTSTRAP_ADMIN_EMAIL).filter(|s| !s.is_empty()),
        })
    }
}
