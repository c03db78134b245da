//! Shared request state.

use crate::cors::AllowedOrigins;
use bizrelay_core::{Config, MailTransport, SmtpTransport};
use bizrelay_registry::{IdentifierPolicy, RegistryClient, RegistryLookup};
use std::sync::Arc;

/// State handed to every handler. Read-only after start-up.
#[derive(Clone)]
pub struct AppState {
    /// Company registry.
    pub lookup: Arc<dyn RegistryLookup>,
    /// Outbound mail.
    pub transport: Arc<dyn MailTransport>,
    /// Accepted identifier lengths.
    pub identifier_policy: IdentifierPolicy,
    /// CORS allow-list.
    pub origins: AllowedOrigins,
}

impl AppState {
    /// Wires the production registry client and SMTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry HTTP client cannot be built.
    pub fn from_config(config: &Config) -> bizrelay_registry::Result<Self> {
        let lookup = RegistryClient::new(config.registry.clone())?;

        Ok(Self {
            lookup: Arc::new(lookup),
            transport: Arc::new(SmtpTransport::new(config.smtp.clone())),
            identifier_policy: config.identifier_policy,
            origins: AllowedOrigins::new(config.allowed_origins.iter().cloned()),
        })
    }
}
