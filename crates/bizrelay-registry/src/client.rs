//! HTTP client for the company registry.

use crate::entity::CanonicalEntity;
use crate::error::{Error, Result};
use crate::identifier::Identifier;
use crate::normalize::{fill_missing_numbers, normalize};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default registry base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.societe.com/api/v1";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const AUTH_HEADER: &str = "X-Authorization";
const AUTH_SCHEME: &str = "socapi";

/// Registry endpoint variant used for lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryEndpoint {
    /// `etablissement/{id}`: establishment record, with address.
    #[default]
    Etablissement,
    /// `entreprise/{id}`: company record.
    Entreprise,
    /// `entreprise/{id}/exist`: existence check; never carries an address.
    Exist,
}

impl RegistryEndpoint {
    /// Returns the path (relative to the base URL) for an identifier.
    #[must_use]
    pub fn path(self, identifier: &Identifier) -> String {
        match self {
            Self::Etablissement => format!("etablissement/{identifier}"),
            Self::Entreprise => format!("entreprise/{identifier}"),
            Self::Exist => format!("entreprise/{identifier}/exist"),
        }
    }
}

impl FromStr for RegistryEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "etablissement" => Ok(Self::Etablissement),
            "entreprise" => Ok(Self::Entreprise),
            "exist" => Ok(Self::Exist),
            other => Err(Error::Config(format!(
                "unknown registry endpoint {other:?} (expected etablissement, entreprise or exist)"
            ))),
        }
    }
}

/// Looks up a company by validated identifier.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Fetches and normalizes the record for `identifier`.
    async fn lookup(&self, identifier: &Identifier) -> Result<CanonicalEntity>;
}

/// Registry client configuration.
#[derive(Clone)]
pub struct RegistrySettings {
    /// Base URL; a trailing slash is added if missing.
    pub base_url: Url,
    /// Secret token; lookups fail with [`Error::Config`] when absent.
    pub token: Option<String>,
    /// Endpoint variant.
    pub endpoint: RegistryEndpoint,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RegistrySettings {
    /// Creates settings with the default endpoint and timeout.
    #[must_use]
    pub const fn new(base_url: Url, token: Option<String>) -> Self {
        Self {
            base_url,
            token,
            endpoint: RegistryEndpoint::Etablissement,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP registry client. Holds one pooled `reqwest::Client` for the process.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    settings: RegistrySettings,
    http_client: reqwest::Client,
}

impl RegistryClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be a base or the HTTP client
    /// fails to initialize.
    pub fn new(mut settings: RegistrySettings) -> Result<Self> {
        if settings.base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "registry base URL {} cannot be a base",
                settings.base_url
            )));
        }
        if !settings.base_url.path().ends_with('/') {
            let path = format!("{}/", settings.base_url.path());
            settings.base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    /// Returns the client settings.
    #[must_use]
    pub const fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Builds the request URL for an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be joined.
    pub fn url_for(&self, identifier: &Identifier) -> Result<Url> {
        Ok(self
            .settings
            .base_url
            .join(&self.settings.endpoint.path(identifier))?)
    }

    /// Performs the authenticated GET and classifies the outcome.
    ///
    /// Returns the raw body of a 200 response.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no token is configured
    /// - [`Error::NotFound`] on 404
    /// - [`Error::Upstream`] on any other non-200 status
    /// - [`Error::Transport`] on connection failure or timeout
    pub async fn fetch_raw(&self, identifier: &Identifier) -> Result<Vec<u8>> {
        let token = self
            .settings
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("registry token is not configured".into()))?;

        let url = self.url_for(identifier)?;
        tracing::debug!(%url, "querying registry");

        let response = self
            .http_client
            .get(url)
            .header(AUTH_HEADER, format!("{AUTH_SCHEME} {token}"))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        tracing::debug!(
            target: "bizrelay_registry::raw",
            %identifier,
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&body),
            "raw registry response"
        );

        match status {
            StatusCode::OK => Ok(body.to_vec()),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            other => Err(Error::Upstream {
                status: other.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

#[async_trait]
impl RegistryLookup for RegistryClient {
    async fn lookup(&self, identifier: &Identifier) -> Result<CanonicalEntity> {
        let raw = self.fetch_raw(identifier).await?;
        let mut entity = normalize(&raw)?;
        fill_missing_numbers(&mut entity, identifier);

        tracing::info!(
            %identifier,
            legal_name = %entity.legal_name,
            city = %entity.postal_address.city,
            "registry lookup succeeded"
        );
        Ok(entity)
    }
}
