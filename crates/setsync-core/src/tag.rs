//! Unique operation tags for observed-remove tracking.
//!
//! Every add to an [`OrSet`](crate::OrSet) mints one fresh [`Tag`], so two
//! adds of the same element remain distinguishable and a remove can
//! tombstone exactly the adds it has observed. Minting goes through the
//! [`TagProvider`] seam so tests can substitute a deterministic source.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A globally unique, unforgeable identifier minted once per add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(Uuid);

impl Tag {
    /// Wrap a caller-supplied UUID as a tag.
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// Source of fresh tags, one per add operation.
///
/// Each call to `mint` consumes one unit of uniqueness: a provider must
/// never hand out the same tag twice.
pub trait TagProvider {
    /// Mint one fresh, never-before-seen tag.
    fn mint(&mut self) -> Tag;
}

/// Default provider minting random v4 UUID tags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UuidTagProvider;

impl TagProvider for UuidTagProvider {
    fn mint(&mut self) -> Tag {
        Tag(Uuid::new_v4())
    }
}

/// Deterministic provider for tests: tags are derived from a fixed replica
/// byte and a monotonically increasing counter.
///
/// Two providers built with different replica bytes mint disjoint tags, so
/// multi-replica scenarios stay reproducible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CounterTagProvider {
    replica: u8,
    next: u64,
}

impl CounterTagProvider {
    /// Create a provider whose tags all carry the given replica byte.
    #[must_use]
    pub fn new(replica: u8) -> Self {
        Self { replica, next: 0 }
    }
}

impl TagProvider for CounterTagProvider {
    fn mint(&mut self) -> Tag {
        let mut bytes = [0u8; 16];
        bytes[0] = self.replica;
        bytes[8..16].copy_from_slice(&self.next.to_be_bytes());
        self.next += 1;
        Tag(Uuid::from_bytes(bytes))
    }
}
