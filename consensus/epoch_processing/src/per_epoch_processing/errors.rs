use types::{Epoch, ParticipationFlags, Slot};

/// Any failure aborts the whole epoch transition; nothing is written to the registry.
#[derive(Debug, PartialEq, Clone)]
pub enum EpochProcessingError {
    /// A validator or proposer index does not exist in a collection of length `len`.
    IndexOutOfRange { index: usize, len: usize },
    /// The input data (or an intermediate result derived from it) is internally inconsistent.
    InvariantViolation(InvariantViolation),
    /// Overflow, underflow or division by zero in reward arithmetic.
    ArithmeticOverflow(safe_arith::ArithError),
    /// An active validator has no participation entry for `epoch`.
    MissingParticipationData { validator_index: usize, epoch: Epoch },
}

#[derive(Debug, PartialEq, Clone)]
pub enum InvariantViolation {
    /// A participation record breaks `head => target => source`.
    InconsistentParticipationFlags {
        validator_index: usize,
        epoch: Epoch,
        flags: ParticipationFlags,
    },
    /// A validator attested in an epoch in which it was not active.
    AttesterNotActive { validator_index: usize, epoch: Epoch },
    /// An attestation was included before `attestation_slot + min_attestation_inclusion_delay`,
    /// or at a distance of zero.
    InvalidInclusion {
        validator_index: usize,
        attestation_slot: Slot,
        inclusion_slot: Slot,
    },
    /// An effective balance is not a multiple of the increment, or exceeds the maximum.
    InvalidEffectiveBalance {
        validator_index: usize,
        effective_balance: u64,
    },
    /// A previous-epoch source attester has no inclusion info.
    ///
    /// (validator_index)
    MissingInclusionInfo(usize),
    /// A total which must be bounded by another total exceeds it.
    TotalBalancesOutOfOrder {
        total: &'static str,
        bound: &'static str,
    },
    /// The aggregated current-epoch active balance disagrees with a direct sum over the registry.
    ActiveBalanceMismatch { aggregated: u128, summed: u128 },
    /// Two per-validator outputs which must be index-aligned have different lengths.
    InconsistentLengths { expected: usize, found: usize },
}

impl From<InvariantViolation> for EpochProcessingError {
    fn from(e: InvariantViolation) -> EpochProcessingError {
        EpochProcessingError::InvariantViolation(e)
    }
}

impl From<safe_arith::ArithError> for EpochProcessingError {
    fn from(e: safe_arith::ArithError) -> EpochProcessingError {
        EpochProcessingError::ArithmeticOverflow(e)
    }
}
