//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with the usual constructors.
macro_rules! uuid_id {
    ($name:ident, $display:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID (e.g. one read back from storage).
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($display, "({})"), self.0)
            }
        }
    };
}

uuid_id!(ProofId, "Proof");
uuid_id!(BatchId, "Batch");
uuid_id!(AnchorId, "Anchor");
uuid_id!(IntentId, "Intent");
uuid_id!(CycleId, "Cycle");

/// Validator identifier. Stable across snapshots; distinct from the
/// validator's public key so key rotation doesn't change identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorId(pub Uuid);

impl ValidatorId {
    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.0)
    }
}

/// Stake weight carried by a validator in a given snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VotePower(pub u64);

impl VotePower {
    /// Minimum non-zero vote power.
    pub const MIN: Self = VotePower(1);

    /// Create from a raw value, clamped to at least 1.
    pub fn new(power: u64) -> Self {
        VotePower(power.max(1))
    }

    /// The raw value.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Sum a list of vote powers.
    pub fn sum(powers: &[VotePower]) -> u64 {
        powers.iter().map(|p| p.0).sum()
    }

    /// Stake-weighted 2/3+1 threshold: `achieved * 3 >= total * 2`.
    ///
    /// Uses a non-strict inequality (matching the boundary cases this
    /// system's attestation scenarios pin down exactly), not a strict `>`.
    pub fn has_quorum(achieved: u64, total: u64) -> bool {
        achieved * 3 >= total * 2
    }
}

impl fmt::Display for VotePower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_power_quorum_boundary() {
        // scenario seed: weights [40,30,20,10], total 100
        assert!(VotePower::has_quorum(70, 100)); // 70*3=210 >= 100*2=200
        assert!(!VotePower::has_quorum(40, 100)); // 40*3=120 < 200
        assert!(VotePower::has_quorum(100, 100));
    }

    #[test]
    fn ids_are_distinct() {
        assert_ne!(ProofId::new(), ProofId::new());
        let p = ProofId::new();
        assert_eq!(ProofId::from_uuid(p.as_uuid()), p);
    }

    #[test]
    fn vote_power_sum() {
        let powers = [VotePower(40), VotePower(30), VotePower(20), VotePower(10)];
        assert_eq!(VotePower::sum(&powers), 100);
    }
}
