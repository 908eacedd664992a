//! # SetSync Core
//!
//! Replicated set CRDTs, HLC timestamps, and merge semantics for SetSync.
//!
//! This crate provides:
//! - A Last-Writer-Wins element set with a configurable tie-break bias
//! - An Observed-Remove set with injectable tag minting
//! - Hybrid Logical Clock (HLC) stamps for ordering operations
//! - A clock-driven replica wrapper emitting deltas for caller-owned
//!   transport
//!
//! Both sets converge under merge regardless of merge order or repetition;
//! shipping state between replicas, persistence, and merge scheduling are
//! the caller's concern.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hlc;
pub mod lww;
pub mod orset;
pub mod replica;
pub mod tag;

pub use hlc::{Hlc, ReplicaId, Timestamp, TimestampError};
pub use lww::{Bias, LwwElementSet};
pub use orset::{OrSet, OrSetDelta};
pub use replica::{LwwDelta, LwwReplica};
pub use tag::{CounterTagProvider, Tag, TagProvider, UuidTagProvider};
