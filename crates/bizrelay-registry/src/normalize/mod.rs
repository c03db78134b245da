//! Normalization of registry payloads into [`CanonicalEntity`].
//!
//! The payload is first classified into one of the [`UpstreamShape`]
//! variants, which only decide where the company-level and
//! establishment-level records live. Resolution then applies the same
//! priority rules whatever the shape:
//!
//! - **Legal name**: `denomination` → `denomination_usuelle` → trade name
//!   (`enseigne`, then `nom_commercial`) → [`UNKNOWN_LEGAL_NAME`]. Each tier
//!   looks at the company record before the establishment record.
//! - **Address**: the company-level `adresse` if it has a city, else the
//!   establishment-level one if it has a city, else empty. Fields are never
//!   mixed between the two.
//!
//! In the wrapped shape the payload root sits between `common` and the
//! establishment, so a root `adresse` still wins over a nested one.

mod shape;

pub use shape::{ExtractedRecord, Object, UpstreamShape};

use crate::entity::{CanonicalEntity, PostalAddress, RegistrationNumbers, UNKNOWN_LEGAL_NAME};
use crate::error::{Error, Result};
use crate::identifier::{Identifier, IdentifierKind};
use serde_json::Value;
use shape::{object, scalar};

const NAME_TIERS: &[&[&str]] = &[
    &["denomination"],
    &["denomination_usuelle"],
    &["enseigne", "nom_commercial"],
];

const VAT_FIELDS: &[&str] = &["numero_tva", "tva", "tva_intracommunautaire"];

/// Decodes and normalizes a raw registry body.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the body is not JSON or its root is not an object.
pub fn normalize(raw: &[u8]) -> Result<CanonicalEntity> {
    let value: Value = serde_json::from_slice(raw)?;
    let Value::Object(root) = value else {
        return Err(Error::Decode("expected a JSON object at the root".into()));
    };

    let shape = UpstreamShape::detect(&root);
    tracing::debug!(shape = shape.name(), "detected registry payload shape");

    Ok(resolve(shape.extract(&root)))
}

/// Applies the resolution rules to an extracted record.
#[must_use]
pub fn resolve(record: ExtractedRecord<'_>) -> CanonicalEntity {
    CanonicalEntity {
        legal_name: resolve_name(record),
        registration_numbers: RegistrationNumbers {
            siren: first_of(record, &["siren"]),
            siret: first_of(record, &["siret"]),
            vat_number: first_of(record, VAT_FIELDS),
        },
        postal_address: resolve_address(record),
    }
}

/// Fills registration numbers the payload did not carry from the identifier
/// that was looked up.
pub fn fill_missing_numbers(entity: &mut CanonicalEntity, identifier: &Identifier) {
    let numbers = &mut entity.registration_numbers;
    if numbers.siren.is_none() {
        numbers.siren = Some(identifier.siren().to_string());
    }
    if identifier.kind() == IdentifierKind::Siret && numbers.siret.is_none() {
        numbers.siret = Some(identifier.as_str().to_string());
    }
}

fn resolve_name(record: ExtractedRecord<'_>) -> String {
    NAME_TIERS
        .iter()
        .find_map(|tier| first_of(record, tier))
        .unwrap_or_else(|| UNKNOWN_LEGAL_NAME.to_string())
}

fn resolve_address(record: ExtractedRecord<'_>) -> PostalAddress {
    record
        .records()
        .filter_map(|r| object(r, "adresse"))
        .find_map(|adresse| {
            let city = scalar(adresse, "ville")?;
            Some(PostalAddress {
                city,
                postal_code: scalar(adresse, "code_postal").unwrap_or_default(),
            })
        })
        .unwrap_or_default()
}

/// First non-empty value among `keys`, company record before establishment record.
fn first_of(record: ExtractedRecord<'_>, keys: &[&str]) -> Option<String> {
    record
        .records()
        .find_map(|r| keys.iter().find_map(|key| scalar(r, key)))
}
