//! Bundling diagnostics.
//!
//! A [`BundleReport`] is produced alongside every merged document. It records
//! what each phase did and, more importantly, what it could not do: name
//! collisions, components that resolved to nothing, and refs left dangling.

use crate::reference::Reference;
use crate::registry::Collision;
use serde::Serialize;

/// A registered component whose origin did not resolve to a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedComponent {
    pub name: String,
    pub origin: Reference,
}

/// A ref left in the merged document that still points at another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingRef {
    /// The merged document, named by its entrypoint.
    pub document: String,
    /// JSON Pointer to the map holding the ref, e.g. `#/paths/~1pets/get`.
    pub location: String,
    pub reference: String,
}

/// Summary counts from a bundling run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub documents_loaded: usize,
    pub refs_normalized: usize,
    pub components_registered: usize,
    pub components_assembled: usize,
    pub components_skipped: usize,
    pub refs_rewritten: usize,
    pub refs_inlined: usize,
    pub dangling_refs: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BundleReport {
    pub diagnostics: Diagnostics,
    pub collisions: Vec<Collision>,
    pub skipped: Vec<SkippedComponent>,
    pub dangling: Vec<DanglingRef>,
}

impl BundleReport {
    /// True when nothing was overwritten, skipped or left dangling.
    pub fn is_clean(&self) -> bool {
        self.collisions.is_empty() && self.skipped.is_empty() && self.dangling.is_empty()
    }

    pub(crate) fn record_skipped(&mut self, name: &str, origin: &Reference) {
        self.diagnostics.components_skipped += 1;
        self.skipped.push(SkippedComponent {
            name: name.to_string(),
            origin: origin.clone(),
        });
    }

    pub(crate) fn record_dangling(&mut self, document: &str, location: &str, reference: &str) {
        self.diagnostics.dangling_refs += 1;
        self.dangling.push(DanglingRef {
            document: document.to_string(),
            location: location.to_string(),
            reference: reference.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_clean() {
        assert!(BundleReport::default().is_clean());
    }

    #[test]
    fn recording_problems_updates_counts() {
        let mut report = BundleReport::default();
        report.record_dangling("api.yml", "#/paths/~1pets/get/parameters/0", "paths/params.yml#/missing");
        report.record_skipped(
            "common_Gone",
            &Reference::parse("common.yml#/components/schemas/Gone").unwrap(),
        );

        assert!(!report.is_clean());
        assert_eq!(report.diagnostics.dangling_refs, 1);
        assert_eq!(report.diagnostics.components_skipped, 1);
    }

    #[test]
    fn serializes_references_as_strings() {
        let mut report = BundleReport::default();
        report.record_skipped(
            "common_Gone",
            &Reference::parse("common.yml#/components/schemas/Gone").unwrap(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json["skipped"][0]["origin"],
            serde_json::json!("common.yml#/components/schemas/Gone")
        );
        assert_eq!(json["diagnostics"]["components_skipped"], serde_json::json!(1));
    }
}
