//! Target configuration and credentials.
//!
//! The target configuration carries only the deployment location. Credentials
//! come from the environment and are never part of any persisted payload.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

pub const USERNAME_VAR: &str = "SFTP_USERNAME";
pub const PASSWORD_VAR: &str = "SFTP_PASSWORD";

const DEFAULT_PORT: u16 = 22;

/// Location of the SFTP server, e.g. `{"url": "sftp://host:2222"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub url: String,
}

/// Parse the target configuration attached to a request.
pub fn parse_target_config(data: &serde_json::Value) -> Result<TargetConfig> {
    let cfg: TargetConfig = serde_json::from_value(data.clone())
        .map_err(|e| Error::InvalidTargetConfig(e.to_string()))?;
    if cfg.url.is_empty() {
        return Err(Error::InvalidTargetConfig("target config missing 'url'".into()));
    }
    Ok(cfg)
}

/// Host and port of an SFTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parse `sftp://host[:port]`; the port defaults to 22.
    pub fn parse(sftp_url: &str) -> Result<Self> {
        let url = Url::parse(sftp_url)
            .map_err(|e| Error::InvalidTargetConfig(format!("invalid URL: {e}")))?;
        if url.scheme() != "sftp" {
            return Err(Error::InvalidTargetConfig(format!(
                "expected sftp:// URL, got {}://",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidTargetConfig(format!("URL has no host: {sftp_url}")))?;
        Ok(Self {
            host: host.to_string(),
            port: url.port().unwrap_or(DEFAULT_PORT),
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Username and password for the SFTP session.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials from `SFTP_USERNAME` and `SFTP_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let username = lookup(USERNAME_VAR).unwrap_or_default();
        let password = lookup(PASSWORD_VAR).unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(Error::Connection(format!(
                "{USERNAME_VAR} and {PASSWORD_VAR} must be set"
            )));
        }
        Ok(Self { username, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
