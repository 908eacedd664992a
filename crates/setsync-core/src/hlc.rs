//! Hybrid Logical Clock (HLC) timestamps for replicated set operations.
//!
//! A stamp combines wall-clock milliseconds, a logical counter for events
//! within the same millisecond, and the minting replica's identity as a
//! final tiebreaker, so any two stamps minted anywhere compare
//! deterministically.
//!
//! # References
//!
//! Kulkarni, Demirbas, et al. "Logical Physical Clocks and Consistent
//! Snapshots in Globally Distributed Databases" (2014)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identity of a replica, used to break timestamp ties deterministically.
///
/// Replica lifecycle is owned by the caller; this crate only compares
/// identities, it never transmits them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ReplicaId(Uuid);

impl ReplicaId {
    /// Wrap a caller-supplied UUID as a replica identity.
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Mint a fresh random replica identity.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A totally ordered timestamp: wall-clock millis, logical counter, replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Wall-clock time in milliseconds since the UNIX epoch
    pub millis: u64,
    /// Logical counter for events within the same millisecond
    pub counter: u32,
    /// Replica that minted this stamp, the final ordering tiebreaker
    pub replica: ReplicaId,
}

impl Timestamp {
    /// Encoded size of [`Timestamp::to_bytes`].
    pub const ENCODED_LEN: usize = 28;

    /// Read the wall clock and build a stamp for `replica`.
    #[must_use]
    pub fn now(replica: ReplicaId) -> Self {
        Self {
            millis: wall_clock_ms(),
            counter: 0,
            replica,
        }
    }

    /// Encode as big-endian bytes for caller-owned envelopes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::ENCODED_LEN);
        bytes.extend_from_slice(&self.millis.to_be_bytes());
        bytes.extend_from_slice(&self.counter.to_be_bytes());
        bytes.extend_from_slice(self.replica.as_uuid().as_bytes());
        bytes
    }

    /// Decode a stamp previously produced by [`Timestamp::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Truncated`] if `bytes` is shorter than
    /// [`Timestamp::ENCODED_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TimestampError> {
        let truncated = || TimestampError::Truncated {
            expected: Self::ENCODED_LEN,
            actual: bytes.len(),
        };

        if bytes.len() < Self::ENCODED_LEN {
            return Err(truncated());
        }

        let millis = u64::from_be_bytes(bytes[0..8].try_into().map_err(|_| truncated())?);
        let counter = u32::from_be_bytes(bytes[8..12].try_into().map_err(|_| truncated())?);
        let replica: [u8; 16] = bytes[12..28].try_into().map_err(|_| truncated())?;

        Ok(Self {
            millis,
            counter,
            replica: ReplicaId::from_uuid(Uuid::from_bytes(replica)),
        })
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.millis, self.counter, self.replica).cmp(&(
            other.millis,
            other.counter,
            other.replica,
        ))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Hybrid logical clock state machine for one replica.
#[derive(Debug, Clone)]
pub struct Hlc {
    last: Timestamp,
}

impl Hlc {
    /// Create a clock for the given replica, primed from the wall clock.
    #[must_use]
    pub fn new(replica: ReplicaId) -> Self {
        Self {
            last: Timestamp::now(replica),
        }
    }

    /// The replica this clock stamps for.
    #[must_use]
    pub fn replica_id(&self) -> ReplicaId {
        self.last.replica
    }

    /// Mint a stamp for a local event, strictly greater than any stamp this
    /// clock has previously minted or observed.
    pub fn tick(&mut self) -> Timestamp {
        let now = wall_clock_ms();

        if now > self.last.millis {
            // Wall clock moved forward, counter starts over
            self.last.millis = now;
            self.last.counter = 0;
        } else {
            // Same or regressed wall clock, bump the counter
            self.last.counter = self.last.counter.saturating_add(1);
        }

        self.last
    }

    /// Advance past a stamp received from another replica, so subsequent
    /// [`Hlc::tick`] calls stay ahead of it.
    pub fn observe(&mut self, remote: Timestamp) {
        let now = wall_clock_ms();

        if now > self.last.millis && now > remote.millis {
            // Wall clock beats both sides
            self.last.millis = now;
            self.last.counter = 0;
        } else if remote.millis > self.last.millis {
            // Remote is ahead, jump past it
            self.last.millis = remote.millis;
            self.last.counter = remote.counter.saturating_add(1);
        } else if remote.millis == self.last.millis {
            // Same millisecond, stay above both counters
            self.last.counter = self.last.counter.max(remote.counter).saturating_add(1);
        } else {
            // Local is ahead, counter alone keeps us past the remote
            self.last.counter = self.last.counter.saturating_add(1);
        }
    }

    /// The most recent stamp, without advancing the clock.
    #[must_use]
    pub fn current(&self) -> Timestamp {
        self.last
    }
}

/// Errors from the timestamp byte codec.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TimestampError {
    /// The input ended before a full stamp could be decoded
    #[error("timestamp truncated: need {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes a full stamp occupies
        expected: usize,
        /// Bytes actually supplied
        actual: usize,
    },
}

/// Current wall clock in milliseconds since the UNIX epoch.
fn wall_clock_ms() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_is_strictly_monotonic() {
        let mut clock = Hlc::new(ReplicaId::random());

        let t1 = clock.tick();
        let t2 = clock.tick();
        let t3 = clock.tick();

        assert!(t1 < t2);
        assert!(t2 < t3);
    }

    #[test]
    fn observe_advances_past_remote() {
        let mut clock_a = Hlc::new(ReplicaId::random());
        let mut clock_b = Hlc::new(ReplicaId::random());

        let t_a = clock_a.tick();
        clock_b.observe(t_a);

        assert!(clock_b.tick() > t_a);
    }

    #[test]
    fn observe_far_future_stamp() {
        let mut clock = Hlc::new(ReplicaId::random());
        let remote = Timestamp {
            millis: u64::MAX - 1,
            counter: 7,
            replica: ReplicaId::random(),
        };

        clock.observe(remote);

        assert!(clock.current() > remote);
    }

    #[test]
    fn byte_codec_roundtrip() {
        let ts = Timestamp {
            millis: 1_704_067_200_000,
            counter: 42,
            replica: ReplicaId::random(),
        };

        let bytes = ts.to_bytes();
        assert_eq!(bytes.len(), Timestamp::ENCODED_LEN);
        assert_eq!(Timestamp::from_bytes(&bytes).unwrap(), ts);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let ts = Timestamp::now(ReplicaId::random());
        let bytes = ts.to_bytes();

        let err = Timestamp::from_bytes(&bytes[..12]).unwrap_err();
        assert!(matches!(
            err,
            TimestampError::Truncated {
                expected: 28,
                actual: 12
            }
        ));
    }

    #[test]
    fn replica_breaks_exact_ties() {
        let a = ReplicaId::from_uuid(Uuid::from_bytes([1; 16]));
        let b = ReplicaId::from_uuid(Uuid::from_bytes([2; 16]));

        let t1 = Timestamp {
            millis: 1000,
            counter: 0,
            replica: a,
        };
        let t2 = Timestamp {
            millis: 1000,
            counter: 0,
            replica: b,
        };

        assert!(t1 < t2);
    }
}
