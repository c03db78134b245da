//! # bizrelay-registry
//!
//! Company-registry lookups by SIREN/SIRET, normalized into one stable record.
//!
//! ## Pipeline
//!
//! ```text
//! candidate ─ Identifier::parse ─→ Identifier ─ RegistryClient::fetch_raw ─→ bytes ─ normalize ─→ CanonicalEntity
//! ```
//!
//! Validation happens before any network call. The registry contract is
//! unstable, so raw bodies are logged at `debug` under the
//! `bizrelay_registry::raw` target before they are parsed.
//!
//! ## Example
//!
//! ```ignore
//! use bizrelay_registry::{Identifier, IdentifierPolicy, RegistryClient, RegistryLookup, RegistrySettings};
//!
//! let settings = RegistrySettings::new(url::Url::parse("https://api.societe.com/api/v1")?, Some(token));
//! let client = RegistryClient::new(settings)?;
//!
//! let id = Identifier::parse("55210055400013", IdentifierPolicy::default())?;
//! let entity = client.lookup(&id).await?;
//! println!("{} ({})", entity.legal_name, entity.postal_address.city);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod entity;
mod error;
mod identifier;
pub mod normalize;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, RegistryClient, RegistryEndpoint, RegistryLookup,
    RegistrySettings,
};
pub use entity::{CanonicalEntity, PostalAddress, RegistrationNumbers, UNKNOWN_LEGAL_NAME};
pub use error::{Error, Result};
pub use identifier::{Identifier, IdentifierKind, IdentifierPolicy};
