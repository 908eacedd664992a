//! Observed-Remove set.
//!
//! Every add mints a unique [`Tag`]; a remove tombstones only the tags it
//! has observed for that element. An element is present while at least one
//! of its tags is untombstoned, so an add concurrent with a remove always
//! survives the merge: the remover never saw the new tag and cannot have
//! tombstoned it. Merge is key-wise set union on both maps, which is
//! commutative, associative, and idempotent.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::tag::{Tag, TagProvider, UuidTagProvider};

/// An Observed-Remove set.
///
/// Tag sets only grow: neither adds nor tombstones are ever deleted, which
/// is what lets replicas converge without coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrSet<T, P = UuidTagProvider>
where
    T: Eq + Hash,
{
    /// Element -> tags minted for adds of that element, across all merged
    /// replicas
    adds: HashMap<T, HashSet<Tag>>,
    /// Element -> tags that have been observed-and-removed
    tombstones: HashMap<T, HashSet<Tag>>,
    /// Source of fresh tags for local adds
    provider: P,
}

impl<T> OrSet<T>
where
    T: Eq + Hash + Clone,
{
    /// Create an empty set minting random UUID tags.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tag_provider(UuidTagProvider)
    }
}

impl<T> Default for OrSet<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> OrSet<T, P>
where
    T: Eq + Hash + Clone,
    P: TagProvider,
{
    /// Create an empty set with an injected tag provider.
    #[must_use]
    pub fn with_tag_provider(provider: P) -> Self {
        Self {
            adds: HashMap::new(),
            tombstones: HashMap::new(),
            provider,
        }
    }

    /// Add `value`, minting one fresh tag for this operation.
    ///
    /// Returns the minted tag as evidence of the add.
    pub fn add(&mut self, value: T) -> Tag {
        let tag = self.provider.mint();
        self.adds.entry(value).or_default().insert(tag);
        tag
    }

    /// Remove `value` by tombstoning every tag currently observed for it.
    ///
    /// No-op when `value` has no add entry. Tags added after this call,
    /// locally or via a later merge, are not in the snapshot and survive.
    pub fn remove(&mut self, value: &T) {
        if let Some(tags) = self.adds.get(value) {
            self.tombstones
                .entry(value.clone())
                .or_default()
                .extend(tags.iter().copied());
        }
    }

    /// Merge another replica's state into this one.
    ///
    /// Key-wise union of both operands' tag sets, independently for adds
    /// and tombstones. Only reads from `other`; the same peer state can be
    /// merged again or elsewhere.
    pub fn merge<Q>(&mut self, other: &OrSet<T, Q>)
    where
        Q: TagProvider,
    {
        for (value, tags) in &other.adds {
            self.adds
                .entry(value.clone())
                .or_default()
                .extend(tags.iter().copied());
        }
        for (value, tags) in &other.tombstones {
            self.tombstones
                .entry(value.clone())
                .or_default()
                .extend(tags.iter().copied());
        }
    }

    /// Whether `value` is currently in the set: true iff at least one of
    /// its add tags has not been observed-removed.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        match self.adds.get(value) {
            None => false,
            Some(tags) => match self.tombstones.get(value) {
                None => !tags.is_empty(),
                Some(dead) => tags.iter().any(|tag| !dead.contains(tag)),
            },
        }
    }

    /// Iterate over the elements currently in the set.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.adds.keys().filter(move |value| self.contains(value))
    }

    /// Number of elements currently in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements().count()
    }

    /// Whether no element is currently in the set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }

    /// Tags and tombstones present here but not yet in `other`.
    ///
    /// Shipping the returned delta and applying it on `other`'s side closes
    /// the gap without transferring the full state; how it travels is the
    /// caller's concern.
    #[must_use]
    pub fn delta_since<Q>(&self, other: &OrSet<T, Q>) -> OrSetDelta<T>
    where
        Q: TagProvider,
    {
        OrSetDelta {
            adds: diff_tag_maps(&self.adds, &other.adds),
            tombstones: diff_tag_maps(&self.tombstones, &other.tombstones),
        }
    }
}

/// Tags in `ours` that `theirs` has not seen, keyed by element.
fn diff_tag_maps<T>(
    ours: &HashMap<T, HashSet<Tag>>,
    theirs: &HashMap<T, HashSet<Tag>>,
) -> HashMap<T, HashSet<Tag>>
where
    T: Eq + Hash + Clone,
{
    let mut fresh = HashMap::new();
    for (value, tags) in ours {
        let seen = theirs.get(value);
        let unseen: HashSet<Tag> = tags
            .iter()
            .copied()
            .filter(|tag| seen.map_or(true, |s| !s.contains(tag)))
            .collect();
        if !unseen.is_empty() {
            fresh.insert(value.clone(), unseen);
        }
    }
    fresh
}

/// New adds and tombstones computed by [`OrSet::delta_since`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrSetDelta<T>
where
    T: Eq + Hash,
{
    /// Tags the receiver has not yet seen, keyed by element
    pub adds: HashMap<T, HashSet<Tag>>,
    /// Tombstones the receiver has not yet seen, keyed by element
    pub tombstones: HashMap<T, HashSet<Tag>>,
}

impl<T> OrSetDelta<T>
where
    T: Eq + Hash + Clone,
{
    /// Whether the delta carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.tombstones.is_empty()
    }

    /// Union this delta into `set`.
    pub fn apply_to<P>(&self, set: &mut OrSet<T, P>)
    where
        P: TagProvider,
    {
        for (value, tags) in &self.adds {
            set.adds
                .entry(value.clone())
                .or_default()
                .extend(tags.iter().copied());
        }
        for (value, tags) in &self.tombstones {
            set.tombstones
                .entry(value.clone())
                .or_default()
                .extend(tags.iter().copied());
        }
    }
}
