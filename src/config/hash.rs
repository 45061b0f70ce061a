//! Document fingerprinting.
//!
//! A fingerprint is a SHA-256 over the canonical JSON form of a document,
//! stamped on every run report so that two reports can be tied to the same
//! document revision.

use sha2::{Digest, Sha256};

use super::document::{Document, ResourceDecl};

/// Hasher for computing document fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentHasher;

impl DocumentHasher {
    /// Creates a new document hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of an entire document.
    ///
    /// Resource order is part of the fingerprint since it is also the
    /// provisioning order.
    #[must_use]
    pub fn fingerprint(&self, document: &Document) -> String {
        let mut hasher = Sha256::new();

        hasher.update(document.format_version.as_bytes());
        hasher.update([0u8]);
        hasher.update(document.name.as_bytes());
        hasher.update([0u8]);

        for resource in &document.resources {
            hasher.update(self.hash_resource(resource).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes the hash of a single resource declaration.
    #[must_use]
    pub fn hash_resource(&self, resource: &ResourceDecl) -> String {
        let mut hasher = Sha256::new();

        hasher.update(resource.resource_type.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(resource.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(resource.id_reference.as_bytes());
        hasher.update([0u8]);

        // serde_json's default map is ordered, so this is canonical.
        let properties = serde_json::to_vec(&resource.properties).unwrap_or_default();
        hasher.update(&properties);

        for tag in &resource.tags {
            hasher.update([0u8]);
            hasher.update(tag.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Returns the short form of a fingerprint for display.
    #[must_use]
    pub fn short(fingerprint: &str) -> &str {
        &fingerprint[..12.min(fingerprint.len())]
    }
}
