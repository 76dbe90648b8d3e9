//! Declaration hashing for change detection.
//!
//! A redirect's hash changes whenever any field it owns changes, and never
//! because of source or tag ordering.

use sha2::{Digest, Sha256};

use super::spec::RedirectSpec;

/// Field separator, keeps adjacent values from running together.
const SEP: &[u8] = &[0x1f];

/// Hasher for computing desired-state hashes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of a single redirect declaration.
    #[must_use]
    pub fn hash_spec(&self, spec: &RedirectSpec) -> String {
        let mut hasher = Sha256::new();

        // Sets are already sorted
        for source in &spec.sources {
            hasher.update(b"source");
            hasher.update(source.as_bytes());
            hasher.update(SEP);
        }

        // Destinations keep their declared order
        for destination in &spec.destinations {
            hasher.update(b"destination");
            hasher.update(destination.url.as_bytes());
            hasher.update(SEP);
            hasher.update(destination.expression.as_bytes());
            hasher.update(SEP);
            hasher.update(destination.monitoring.as_str().as_bytes());
            hasher.update(SEP);
        }

        hasher.update(spec.redirect_type.as_bytes());
        hasher.update(SEP);
        hasher.update([
            u8::from(spec.keep_query_string),
            u8::from(spec.uri_forwarding),
            u8::from(spec.tracking),
        ]);

        for tag in &spec.tags {
            hasher.update(b"tag");
            hasher.update(tag.as_bytes());
            hasher.update(SEP);
        }

        hex::encode(hasher.finalize())
    }
}
