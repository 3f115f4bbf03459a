//! Canonical serialization boundary.
//!
//! Filter stages that compare whole entities (Distinct, whole-object
//! Search) do so through a [`CanonicalSerializer`] collaborator: two
//! entities are "the same" exactly when they serialize identically. The
//! core does not define a wire format; it only requires determinism.

use serde_json::Value;

/// Produces a deterministic, structurally comparable representation of
/// an entity value.
pub trait CanonicalSerializer: Send + Sync {
    /// Serializes `value` to its canonical textual form.
    fn canonical(&self, value: &Value) -> String;
}

/// Canonical JSON: object keys in lexicographic order, no insignificant
/// whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCanonicalizer;

impl CanonicalSerializer for JsonCanonicalizer {
    fn canonical(&self, value: &Value) -> String {
        // serde_json's default map keeps keys in sorted order, so the
        // compact form is already canonical.
        value.to_string()
    }
}
