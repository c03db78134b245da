//! Process-wide configuration.
//!
//! Built once at start-up from environment variables and shared read-only
//! afterwards. Malformed values are rejected here; missing secrets are not,
//! they surface per request as configuration errors.

use crate::error::{Error, Result};
use bizrelay_registry::{
    DEFAULT_BASE_URL, IdentifierPolicy, RegistryEndpoint, RegistrySettings,
};
use bizrelay_smtp::Security;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 8091;

/// Default CORS allow-list.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:8082",
    "https://vintagestandards.fr",
    "https://dev.vintagestandards.fr",
];

/// Default relay port (implicit TLS).
pub const DEFAULT_SMTP_PORT: u16 = 465;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HELO_NAME: &str = "localhost";

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
    /// Registry client settings.
    pub registry: RegistrySettings,
    /// Accepted identifier lengths.
    pub identifier_policy: IdentifierPolicy,
    /// Relay settings.
    pub smtp: SmtpSettings,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;

        let allowed_origins = get("ALLOWED_ORIGINS").map_or_else(
            || DEFAULT_ALLOWED_ORIGINS.iter().map(ToString::to_string).collect(),
            |v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(ToString::to_string)
                    .collect()
            },
        );

        let base_url = get("REGISTRY_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::config(format!("REGISTRY_BASE_URL {base_url:?}: {e}")))?;

        let mut registry = RegistrySettings::new(base_url, get("REGISTRY_TOKEN"));
        registry.endpoint = get("REGISTRY_ENDPOINT")
            .map(|v| RegistryEndpoint::from_str(&v))
            .transpose()
            .map_err(|e| Error::config(format!("REGISTRY_ENDPOINT: {e}")))?
            .unwrap_or_default();
        registry.timeout = Duration::from_secs(parse_or(
            get("REGISTRY_TIMEOUT_SECS"),
            "REGISTRY_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);

        let identifier_policy = get("IDENTIFIER_POLICY")
            .map(|v| IdentifierPolicy::from_str(&v))
            .transpose()
            .map_err(|e| Error::config(format!("IDENTIFIER_POLICY: {e}")))?
            .unwrap_or_default();

        let smtp_port = parse_or(get("SMTP_PORT"), "SMTP_PORT", DEFAULT_SMTP_PORT)?;
        let security = match get("SMTP_SECURITY") {
            Some(v) => v
                .parse::<Security>()
                .map_err(|e| Error::config(format!("SMTP_SECURITY: {e}")))?,
            None => Security::for_port(smtp_port),
        };

        let username = get("SMTP_USER");
        let smtp = SmtpSettings {
            host: get("SMTP_HOST"),
            port: smtp_port,
            security,
            from: get("SMTP_FROM").or_else(|| username.clone()),
            username,
            password: get("SMTP_PASSWORD"),
            timeout: Duration::from_secs(parse_or(
                get("SMTP_TIMEOUT_SECS"),
                "SMTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            helo_name: get("SMTP_HELO_NAME").unwrap_or_else(|| DEFAULT_HELO_NAME.to_string()),
        };

        Ok(Self {
            port,
            allowed_origins,
            registry,
            identifier_policy,
            smtp,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.map_or(Ok(default), |v| {
        v.parse()
            .map_err(|e| Error::config(format!("{key} {v:?}: {e}")))
    })
}

/// Relay settings as configured. Any of the connection fields may be absent.
#[derive(Clone)]
pub struct SmtpSettings {
    /// Relay hostname.
    pub host: Option<String>,
    /// Relay port.
    pub port: u16,
    /// Transport strategy.
    pub security: Security,
    /// Username for AUTH.
    pub username: Option<String>,
    /// Password for AUTH.
    pub password: Option<String>,
    /// Sender address (envelope and `From:` header).
    pub from: Option<String>,
    /// Overall deadline for one delivery.
    pub timeout: Duration,
    /// EHLO hostname.
    pub helo_name: String,
}

impl SmtpSettings {
    /// Settings for a relay at `host:port`, with the strategy derived from the port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port,
            security: Security::for_port(port),
            username: None,
            password: None,
            from: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            helo_name: DEFAULT_HELO_NAME.to_string(),
        }
    }

    /// Resolves the settings needed to deliver a message.
    ///
    /// Credentials are required unless the relay is reached without
    /// encryption (a local relay).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing setting.
    pub fn relay(&self) -> Result<Relay<'_>> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| Error::config("SMTP_HOST is not set"))?;
        let from = self
            .from
            .as_deref()
            .ok_or_else(|| Error::config("SMTP_FROM or SMTP_USER is not set"))?;

        let credentials = match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => Some((user, password)),
            (Some(_), None) => return Err(Error::config("SMTP_PASSWORD is not set")),
            (None, Some(_)) => return Err(Error::config("SMTP_USER is not set")),
            (None, None) if self.security == Security::None => None,
            (None, None) => return Err(Error::config("SMTP_USER and SMTP_PASSWORD are not set")),
        };

        Ok(Relay {
            host,
            port: self.port,
            security: self.security,
            credentials,
            from,
            timeout: self.timeout,
            helo_name: &self.helo_name,
        })
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .field("helo_name", &self.helo_name)
            .finish()
    }
}

/// Resolved relay settings for one delivery.
#[derive(Clone, Copy)]
pub struct Relay<'a> {
    /// Relay hostname.
    pub host: &'a str,
    /// Relay port.
    pub port: u16,
    /// Transport strategy.
    pub security: Security,
    /// Username and password, when AUTH should be attempted.
    pub credentials: Option<(&'a str, &'a str)>,
    /// Sender address.
    pub from: &'a str,
    /// Overall deadline for the delivery.
    pub timeout: Duration,
    /// EHLO hostname.
    pub helo_name: &'a str,
}

impl fmt::Debug for Relay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.credentials.map(|(user, _)| user))
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
