use crate::Slot;
#[cfg(feature = "arbitrary-fuzz")]
use arbitrary::Arbitrary;
use serde::{Deserialize, Serialize};

pub const TIMELY_SOURCE_FLAG_INDEX: usize = 0;
pub const TIMELY_TARGET_FLAG_INDEX: usize = 1;
pub const TIMELY_HEAD_FLAG_INDEX: usize = 2;

/// Correctness bits of a single attestation: source, target and head.
///
/// Stored as one byte. The bits are independent here; the implication chain
/// `head => target => source` is checked by the consumer, since a record that breaks it is
/// corrupt input rather than something to repair.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipationFlags {
    bits: u8,
}

impl ParticipationFlags {
    pub fn new(source: bool, target: bool, head: bool) -> Self {
        let mut bits = 0;
        for (flag_index, set) in [
            (TIMELY_SOURCE_FLAG_INDEX, source),
            (TIMELY_TARGET_FLAG_INDEX, target),
            (TIMELY_HEAD_FLAG_INDEX, head),
        ] {
            if set {
                bits |= 1 << flag_index;
            }
        }
        Self { bits }
    }

    pub fn is_source(&self) -> bool {
        self.bits & (1 << TIMELY_SOURCE_FLAG_INDEX) != 0
    }

    pub fn is_target(&self) -> bool {
        self.bits & (1 << TIMELY_TARGET_FLAG_INDEX) != 0
    }

    pub fn is_head(&self) -> bool {
        self.bits & (1 << TIMELY_HEAD_FLAG_INDEX) != 0
    }

    /// Returns `true` if `head => target => source` holds for these bits.
    pub fn is_consistent(&self) -> bool {
        (!self.is_head() || self.is_target()) && (!self.is_target() || self.is_source())
    }
}

/// One included attestation by a validator, as seen by the participation index of an epoch.
///
/// A validator may have several records for the same epoch (the same vote included by more than
/// one block); epoch accounting rewards the earliest inclusion.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub flags: ParticipationFlags,
    /// The slot the validator was assigned to attest at.
    pub attestation_slot: Slot,
    /// The slot of the block which included the attestation.
    pub inclusion_slot: Slot,
    /// The proposer of the block at `inclusion_slot`.
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
}

impl ParticipationRecord {
    /// Slots between assignment and inclusion, or `None` if the record is included before it
    /// was assigned.
    pub fn inclusion_delay(&self) -> Option<u64> {
        self.inclusion_slot
            .as_u64()
            .checked_sub(self.attestation_slot.as_u64())
    }
}
