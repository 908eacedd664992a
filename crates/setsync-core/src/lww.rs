//! Last-Writer-Wins element set.
//!
//! Tracks, per element, the latest add stamp and the latest remove stamp
//! seen. Membership compares the two; exact ties are decided by the set's
//! [`Bias`]. Merge takes the key-wise maximum of both stamp maps, which is
//! commutative, associative, and idempotent, so replicas converge no matter
//! how merges are ordered or repeated.
//!
//! Local `add`/`remove` overwrite unconditionally and assume each actor
//! issues non-decreasing stamps; the `observe_*` path keeps the maximum and
//! is what `merge` and remote delta application go through.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// Tie-break rule applied when an element's add and remove stamps are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bias {
    /// Equal stamps keep the element in the set
    #[default]
    AddsWin,
    /// Equal stamps drop the element from the set
    RemovalsWin,
}

/// A Last-Writer-Wins element set.
///
/// Generic over the element type `T` and the stamp type `S`; any totally
/// ordered `Copy` stamp works, from plain `u64` milliseconds to the crate's
/// own [`Timestamp`](crate::Timestamp).
///
/// Entries are never deleted: each map holds the maximum stamp ever
/// observed for that (element, operation) pair, whether from a local call
/// or a merged peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwwElementSet<T, S>
where
    T: Eq + Hash,
{
    /// Element -> latest add stamp observed
    adds: HashMap<T, S>,
    /// Element -> latest remove stamp observed
    removes: HashMap<T, S>,
    /// Tie-break rule, fixed at construction
    bias: Bias,
}

impl<T, S> LwwElementSet<T, S>
where
    T: Eq + Hash + Clone,
    S: Ord + Copy,
{
    /// Create an empty set with the default [`Bias::AddsWin`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_bias(Bias::default())
    }

    /// Create an empty set with an explicit tie-break bias.
    #[must_use]
    pub fn with_bias(bias: Bias) -> Self {
        Self {
            adds: HashMap::new(),
            removes: HashMap::new(),
            bias,
        }
    }

    /// The tie-break bias this set was constructed with.
    #[must_use]
    pub fn bias(&self) -> Bias {
        self.bias
    }

    /// Record a local add at `stamp`, replacing any prior add stamp.
    ///
    /// The overwrite is unconditional: a single actor is assumed to issue
    /// non-decreasing stamps. Remote state goes through [`Self::merge`] or
    /// [`Self::observe_add`] instead, which keep the maximum.
    pub fn add(&mut self, value: T, stamp: S) {
        self.adds.insert(value, stamp);
    }

    /// Record a local remove at `stamp`, replacing any prior remove stamp.
    ///
    /// Removing an element never added is permitted and simply records a
    /// remove stamp with no corresponding add stamp.
    pub fn remove(&mut self, value: T, stamp: S) {
        self.removes.insert(value, stamp);
    }

    /// Fold a remotely observed add into the set, keeping the maximum stamp.
    pub fn observe_add(&mut self, value: T, stamp: S) {
        self.adds
            .entry(value)
            .and_modify(|existing| {
                if stamp > *existing {
                    *existing = stamp;
                }
            })
            .or_insert(stamp);
    }

    /// Fold a remotely observed remove into the set, keeping the maximum
    /// stamp.
    pub fn observe_remove(&mut self, value: T, stamp: S) {
        self.removes
            .entry(value)
            .and_modify(|existing| {
                if stamp > *existing {
                    *existing = stamp;
                }
            })
            .or_insert(stamp);
    }

    /// Merge another replica's state into this one.
    ///
    /// For each element in either operand the result holds the pairwise
    /// maximum stamp, independently for adds and removes. Only reads from
    /// `other`; the same peer state can be merged again or elsewhere.
    pub fn merge(&mut self, other: &Self) {
        for (value, &stamp) in &other.adds {
            self.observe_add(value.clone(), stamp);
        }
        for (value, &stamp) in &other.removes {
            self.observe_remove(value.clone(), stamp);
        }
    }

    /// Whether `value` is currently in the set.
    ///
    /// False without an add stamp; true with an add stamp and no remove
    /// stamp; otherwise the later stamp wins and exact ties fall to the
    /// bias.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        let Some(added) = self.adds.get(value) else {
            return false;
        };
        match self.removes.get(value) {
            None => true,
            Some(removed) => match added.cmp(removed) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => self.bias == Bias::AddsWin,
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
}

impl<T, S> Default for LwwElementSet<T, S>
where
    T: Eq + Hash + Clone,
    S: Ord + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_contains() {
        let mut set = LwwElementSet::new();

        set.add(1, 10u64);

        assert!(set.contains(&1));
    }

    #[test]
    fn later_remove_wins() {
        let mut set = LwwElementSet::new();

        set.add(1, 10u64);
        set.remove(1, 20);

        assert!(!set.contains(&1));
    }

    #[test]
    fn later_re_add_wins() {
        let mut set = LwwElementSet::new();

        set.add(1, 10u64);
        set.remove(1, 20);
        set.add(1, 30);

        assert!(set.contains(&1));
    }

    #[test]
    fn remove_without_add_is_recorded() {
        let mut set = LwwElementSet::new();

        set.remove(1, 10u64);

        assert!(!set.contains(&1));

        // A later add still wins over the dangling remove.
        set.add(1, 20);
        assert!(set.contains(&1));
    }

    #[test]
    fn local_add_overwrites_unconditionally() {
        let mut set = LwwElementSet::new();

        set.add("x", 10u64);
        set.remove("x", 7);
        assert!(set.contains(&"x"));

        // An out-of-order local add regresses the stamp; last call wins.
        set.add("x", 5);
        assert!(!set.contains(&"x"));
    }

    #[test]
    fn observe_add_keeps_maximum() {
        let mut set = LwwElementSet::new();

        set.observe_add("x", 10u64);
        set.observe_add("x", 5);
        set.remove("x", 7);

        assert!(set.contains(&"x"));
    }

    #[test]
    fn merge_without_conflict() {
        let mut a = LwwElementSet::new();
        a.add(1, 10u64);
        a.add(2, 10);

        let mut b = LwwElementSet::new();
        b.add(1, 20u64);
        b.remove(2, 20);

        a.merge(&b);

        assert!(a.contains(&1));
        assert!(!a.contains(&2));
    }

    #[test]
    fn merge_does_not_regress_stamps() {
        let mut a = LwwElementSet::new();
        a.add("x", 30u64);

        let mut b = LwwElementSet::new();
        b.add("x", 3u64);
        b.remove("x", 5);

        a.merge(&b);

        assert!(a.contains(&"x"));
    }

    #[test]
    fn equal_stamps_fall_to_bias() {
        let mut adds_win = LwwElementSet::new();
        adds_win.add(2, 10u64);
        let mut peer = LwwElementSet::new();
        peer.remove(2, 10u64);
        adds_win.merge(&peer);
        assert!(adds_win.contains(&2));

        let mut removals_win = LwwElementSet::with_bias(Bias::RemovalsWin);
        removals_win.add(2, 10u64);
        removals_win.merge(&peer);
        assert!(!removals_win.contains(&2));
    }

    #[test]
    fn elements_reflects_membership() {
        let mut set = LwwElementSet::new();

        set.add("a", 10u64);
        set.add("b", 10);
        set.remove("b", 20);

        let present: Vec<_> = set.elements().collect();
        assert_eq!(present, vec![&"a"]);
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }
}
