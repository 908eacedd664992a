//! Clock-driven replica wrapper for the LWW element set.
//!
//! Binds a hybrid logical clock to an [`LwwElementSet`] so local operations
//! are stamped monotonically, and emits per-operation deltas the caller can
//! ship to peers over whatever transport it owns. Applying a delta first
//! advances the clock past every remote stamp, then folds the entries in
//! through the maximum-keeping path.

use serde::{Deserialize, Serialize};
use std::hash::Hash;

use crate::hlc::{Hlc, ReplicaId, Timestamp};
use crate::lww::{Bias, LwwElementSet};

/// One replica of a Last-Writer-Wins set, stamping its own operations.
#[derive(Debug, Clone)]
pub struct LwwReplica<T>
where
    T: Eq + Hash,
{
    /// CRDT state for this replica
    pub state: LwwElementSet<T, Timestamp>,
    /// Hybrid logical clock stamping local operations
    pub clock: Hlc,
}

impl<T> LwwReplica<T>
where
    T: Eq + Hash + Clone,
{
    /// Create an empty replica with the default [`Bias::AddsWin`].
    #[must_use]
    pub fn new(replica: ReplicaId) -> Self {
        Self::with_bias(replica, Bias::default())
    }

    /// Create an empty replica with an explicit tie-break bias.
    ///
    /// All replicas of one logical set must share the same bias for their
    /// membership answers to converge.
    #[must_use]
    pub fn with_bias(replica: ReplicaId, bias: Bias) -> Self {
        Self {
            state: LwwElementSet::with_bias(bias),
            clock: Hlc::new(replica),
        }
    }

    /// The identity this replica stamps operations with.
    #[must_use]
    pub fn replica_id(&self) -> ReplicaId {
        self.clock.replica_id()
    }

    /// Add `value`, stamped by this replica's clock.
    ///
    /// Returns a delta describing the operation for caller-owned shipping.
    #[must_use]
    pub fn add(&mut self, value: T) -> LwwDelta<T> {
        let stamp = self.clock.tick();
        self.state.add(value.clone(), stamp);

        tracing::debug!(
            replica = %self.replica_id(),
            stamp = ?stamp,
            "Recorded local add"
        );
        LwwDelta {
            adds: vec![(value, stamp)],
            removes: Vec::new(),
        }
    }

    /// Remove `value`, stamped by this replica's clock.
    ///
    /// As with [`LwwElementSet::remove`], the element need not have been
    /// added first.
    #[must_use]
    pub fn remove(&mut self, value: T) -> LwwDelta<T> {
        let stamp = self.clock.tick();
        self.state.remove(value.clone(), stamp);

        tracing::debug!(
            replica = %self.replica_id(),
            stamp = ?stamp,
            "Recorded local remove"
        );
        LwwDelta {
            adds: Vec::new(),
            removes: vec![(value, stamp)],
        }
    }

    /// Apply a delta produced by a peer replica.
    ///
    /// Every stamp in the delta is observed by the clock before the entries
    /// are folded in, so stamps minted here afterwards sort later.
    pub fn apply_delta(&mut self, delta: &LwwDelta<T>) {
        for (_, stamp) in &delta.adds {
            self.clock.observe(*stamp);
        }
        for (_, stamp) in &delta.removes {
            self.clock.observe(*stamp);
        }

        for (value, stamp) in &delta.adds {
            self.state.observe_add(value.clone(), *stamp);
        }
        for (value, stamp) in &delta.removes {
            self.state.observe_remove(value.clone(), *stamp);
        }

        tracing::debug!(
            replica = %self.replica_id(),
            adds = delta.adds.len(),
            removes = delta.removes.len(),
            "Applied delta"
        );
    }

    /// Merge a peer replica's full state into this one.
    pub fn merge(&mut self, other: &Self) {
        self.clock.observe(other.clock.current());
        self.state.merge(&other.state);

        tracing::debug!(
            replica = %self.replica_id(),
            peer = %other.replica_id(),
            "Merged peer state"
        );
    }

    /// Whether `value` is currently in the set.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.state.contains(value)
    }

    /// Iterate over the elements currently in the set.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.state.elements()
    }

    /// Number of elements currently in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Whether no element is currently in the set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

/// Stamped operations emitted by one replica for replay on others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LwwDelta<T> {
    /// Elements added, with their stamps
    pub adds: Vec<(T, Timestamp)>,
    /// Elements removed, with their stamps
    pub removes: Vec<(T, Timestamp)>,
}

impl<T> LwwDelta<T> {
    /// Whether the delta carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }
}
