//! Canonical company record returned to callers.

use serde::{Deserialize, Serialize};

/// Legal name used when no upstream name field is populated.
pub const UNKNOWN_LEGAL_NAME: &str = "Nom Inconnu";

/// Stable, upstream-independent company record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEntity {
    /// Resolved legal name; never empty.
    pub legal_name: String,
    /// Registration numbers.
    pub registration_numbers: RegistrationNumbers,
    /// Postal address; both fields empty when unavailable.
    pub postal_address: PostalAddress,
}

/// SIREN, SIRET and intra-community VAT number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationNumbers {
    /// 9-digit company identifier.
    pub siren: Option<String>,
    /// 14-digit establishment identifier.
    pub siret: Option<String>,
    /// Intra-community VAT number.
    pub vat_number: Option<String>,
}

/// City and postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    /// City name.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
}
