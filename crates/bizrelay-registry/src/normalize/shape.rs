//! Detection of the known upstream payload shapes.

use serde_json::{Map, Value};

/// A decoded JSON object.
pub type Object = Map<String, Value>;

/// Known registry payload layouts.
///
/// Detection tries each variant in declaration order; the first match wins.
/// Adding a layout means adding a variant, a detector and an `extract` arm;
/// the resolution rules in the parent module stay untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpstreamShape<'a> {
    /// Record wrapped in a root-level `common` object.
    Wrapped(&'a Object),
    /// Company fields at the root plus a nested `etablissement` object.
    Nested(&'a Object),
    /// Everything at the root.
    Flat,
}

type Detector = fn(&Object) -> Option<UpstreamShape<'_>>;

const DETECTORS: &[Detector] = &[detect_wrapped, detect_nested];

fn detect_wrapped(root: &Object) -> Option<UpstreamShape<'_>> {
    object(root, "common").map(UpstreamShape::Wrapped)
}

fn detect_nested(root: &Object) -> Option<UpstreamShape<'_>> {
    object(root, "etablissement").map(UpstreamShape::Nested)
}

impl<'a> UpstreamShape<'a> {
    /// Detects the shape of a decoded payload.
    #[must_use]
    pub fn detect(root: &'a Object) -> Self {
        DETECTORS
            .iter()
            .find_map(|detect| detect(root))
            .unwrap_or(Self::Flat)
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wrapped(_) => "wrapped",
            Self::Nested(_) => "nested",
            Self::Flat => "flat",
        }
    }

    /// Splits the payload into its company-level and establishment-level records.
    #[must_use]
    pub fn extract(self, root: &'a Object) -> ExtractedRecord<'a> {
        match self {
            Self::Wrapped(common) => ExtractedRecord {
                company: common,
                envelope: Some(root),
                establishment: object(common, "etablissement")
                    .or_else(|| object(root, "etablissement")),
            },
            Self::Nested(establishment) => ExtractedRecord {
                company: root,
                envelope: None,
                establishment: Some(establishment),
            },
            Self::Flat => ExtractedRecord {
                company: root,
                envelope: None,
                establishment: None,
            },
        }
    }
}

/// Uniform view over any upstream shape.
#[derive(Debug, Clone, Copy)]
pub struct ExtractedRecord<'a> {
    /// Company-level fields.
    pub company: &'a Object,
    /// Root fields around a wrapped company record.
    pub envelope: Option<&'a Object>,
    /// Establishment-level fields, when present.
    pub establishment: Option<&'a Object>,
}

impl<'a> ExtractedRecord<'a> {
    /// Records in lookup order: company, wrapping root, then establishment.
    pub fn records(self) -> impl Iterator<Item = &'a Object> {
        std::iter::once(self.company)
            .chain(self.envelope)
            .chain(self.establishment)
    }
}

pub(crate) fn object<'a>(parent: &'a Object, key: &str) -> Option<&'a Object> {
    parent.get(key).and_then(Value::as_object)
}

/// Reads a scalar field leniently: strings and numbers decode, anything else
/// (null, arrays, objects, booleans) is treated as absent. Blank strings are absent.
pub(crate) fn scalar(parent: &Object, key: &str) -> Option<String> {
    let text = match parent.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root(value: &Value) -> &Object {
        value.as_object().unwrap()
    }

    #[test]
    fn test_detect_order() {
        let wrapped = json!({"common": {"denomination": "A"}, "etablissement": {}});
        assert_eq!(UpstreamShape::detect(root(&wrapped)).name(), "wrapped");

        let nested = json!({"denomination": "A", "etablissement": {"adresse": {}}});
        assert_eq!(UpstreamShape::detect(root(&nested)).name(), "nested");

        let flat = json!({"denomination": "A", "etablissement": null});
        assert_eq!(UpstreamShape::detect(root(&flat)), UpstreamShape::Flat);
    }

    #[test]
    fn test_wrapped_falls_back_to_root_establishment() {
        let value = json!({"common": {"denomination": "A"}, "etablissement": {"siret": "1"}});
        let record = UpstreamShape::detect(root(&value)).extract(root(&value));
        assert_eq!(scalar(record.company, "denomination").as_deref(), Some("A"));
        assert_eq!(
            record.establishment.and_then(|e| scalar(e, "siret")).as_deref(),
            Some("1")
        );
        assert_eq!(record.records().count(), 3);
    }

    #[test]
    fn test_wrapped_root_comes_before_establishment() {
        let value = json!({
            "common": {"denomination": "A"},
            "adresse": {"ville": "LYON"},
            "etablissement": {"adresse": {"ville": "NANTES"}}
        });
        let record = UpstreamShape::detect(root(&value)).extract(root(&value));
        let cities: Vec<_> = record
            .records()
            .filter_map(|r| object(r, "adresse"))
            .filter_map(|a| scalar(a, "ville"))
            .collect();
        assert_eq!(cities, ["LYON", "NANTES"]);
    }

    #[test]
    fn test_scalar_is_lenient() {
        let value = json!({
            "s": " PARIS ",
            "n": 75001,
            "blank": "   ",
            "null": null,
            "arr": [1],
            "bool": true
        });
        let obj = root(&value);
        assert_eq!(scalar(obj, "s").as_deref(), Some("PARIS"));
        assert_eq!(scalar(obj, "n").as_deref(), Some("75001"));
        assert_eq!(scalar(obj, "blank"), None);
        assert_eq!(scalar(obj, "null"), None);
        assert_eq!(scalar(obj, "arr"), None);
        assert_eq!(scalar(obj, "bool"), None);
        assert_eq!(scalar(obj, "missing"), None);
    }
}
