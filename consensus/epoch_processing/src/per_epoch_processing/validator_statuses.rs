use super::{EpochContext, Error, InvariantViolation};
use crate::metrics;
use rayon::prelude::*;
use safe_arith::{ArithError, SafeArith};
use types::{
    ChainSpec, Epoch, ParticipationProvider, ParticipationRecord, Slot, ValidatorRegistry,
};

#[cfg(feature = "arbitrary-fuzz")]
use arbitrary::Arbitrary;

const IS_SLASHED: u16 = 1 << 0;
const IS_WITHDRAWABLE_IN_CURRENT_EPOCH: u16 = 1 << 1;
const IS_ACTIVE_IN_CURRENT_EPOCH: u16 = 1 << 2;
const IS_ACTIVE_IN_PREVIOUS_EPOCH: u16 = 1 << 3;
const IS_CURRENT_EPOCH_ATTESTER: u16 = 1 << 4;
const IS_CURRENT_EPOCH_TARGET_ATTESTER: u16 = 1 << 5;
const IS_PREVIOUS_EPOCH_ATTESTER: u16 = 1 << 6;
const IS_PREVIOUS_EPOCH_SOURCE_ATTESTER: u16 = 1 << 7;
const IS_PREVIOUS_EPOCH_TARGET_ATTESTER: u16 = 1 << 8;
const IS_PREVIOUS_EPOCH_HEAD_ATTESTER: u16 = 1 << 9;

/// Generates a getter and a setter for one bit of `StatusFlags`.
macro_rules! status_flag {
    ($getter: ident, $setter: ident, $mask: ident) => {
        pub fn $getter(&self) -> bool {
            self.bits & $mask != 0
        }

        pub fn $setter(&mut self) {
            self.bits |= $mask;
        }
    };
}

/// Identity and attestation flags for one validator, packed into a single `u16`.
///
/// Flags are only ever set, never cleared.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    bits: u16,
}

impl StatusFlags {
    status_flag!(is_slashed, set_slashed, IS_SLASHED);
    status_flag!(
        is_withdrawable_in_current_epoch,
        set_withdrawable_in_current_epoch,
        IS_WITHDRAWABLE_IN_CURRENT_EPOCH
    );
    status_flag!(
        is_active_in_current_epoch,
        set_active_in_current_epoch,
        IS_ACTIVE_IN_CURRENT_EPOCH
    );
    status_flag!(
        is_active_in_previous_epoch,
        set_active_in_previous_epoch,
        IS_ACTIVE_IN_PREVIOUS_EPOCH
    );
    status_flag!(
        is_current_epoch_attester,
        set_current_epoch_attester,
        IS_CURRENT_EPOCH_ATTESTER
    );
    status_flag!(
        is_current_epoch_target_attester,
        set_current_epoch_target_attester,
        IS_CURRENT_EPOCH_TARGET_ATTESTER
    );
    status_flag!(
        is_previous_epoch_attester,
        set_previous_epoch_attester,
        IS_PREVIOUS_EPOCH_ATTESTER
    );
    status_flag!(
        is_previous_epoch_source_attester,
        set_previous_epoch_source_attester,
        IS_PREVIOUS_EPOCH_SOURCE_ATTESTER
    );
    status_flag!(
        is_previous_epoch_target_attester,
        set_previous_epoch_target_attester,
        IS_PREVIOUS_EPOCH_TARGET_ATTESTER
    );
    status_flag!(
        is_previous_epoch_head_attester,
        set_previous_epoch_head_attester,
        IS_PREVIOUS_EPOCH_HEAD_ATTESTER
    );

    pub fn into_u16(self) -> u16 {
        self.bits
    }
}

/// The information required to reward a block producer for including an attestation in a block.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusionInfo {
    /// The slot of the block which included the attestation.
    pub slot: Slot,
    /// The distance between the attestation slot and the slot that attestation was included in a
    /// block. Never zero.
    pub delay: u64,
    /// The index of the proposer at the slot where the attestation was included.
    pub proposer_index: usize,
}

impl InclusionInfo {
    /// Tests if some `other` `InclusionInfo` has a lower inclusion delay than `self`. If so,
    /// replaces `self` with `other`.
    pub fn update(&mut self, other: &Self) {
        if other.delay < self.delay {
            *self = *other;
        }
    }
}

/// Information required to reward some validator during the current and previous epoch.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidatorStatus {
    pub flags: StatusFlags,
    /// The validator's effective balance in the _current_ epoch.
    pub current_epoch_effective_balance: u64,
    /// Information used to reward the block producer of this validators earliest-included
    /// source-matching attestation. Present exactly when the validator is a previous epoch source
    /// attester.
    pub inclusion_info: Option<InclusionInfo>,
    /// The validator's balance before the epoch transition.
    pub balance: u64,
    /// The validator's inactivity score before the epoch transition.
    pub inactivity_score: u64,
}

impl ValidatorStatus {
    /// Returns `true` if the validator may receive attestation or inactivity deltas.
    pub fn is_eligible(&self) -> bool {
        self.flags.is_active_in_previous_epoch()
            || (self.flags.is_slashed() && !self.flags.is_withdrawable_in_current_epoch())
    }

    pub fn is_unslashed_previous_epoch_source_attester(&self) -> bool {
        !self.flags.is_slashed() && self.flags.is_previous_epoch_source_attester()
    }

    pub fn is_unslashed_previous_epoch_target_attester(&self) -> bool {
        !self.flags.is_slashed() && self.flags.is_previous_epoch_target_attester()
    }

    pub fn is_unslashed_previous_epoch_head_attester(&self) -> bool {
        !self.flags.is_slashed() && self.flags.is_previous_epoch_head_attester()
    }
}

/// The total effective balances for different sets of validators during the previous and current
/// epochs.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
pub struct TotalBalances {
    /// The effective balance increment of the `ChainSpec`.
    effective_balance_increment: u64,
    /// The total effective balance of all active validators during the _current_ epoch.
    current_epoch: u128,
    /// The total effective balance of all active validators during the _previous_ epoch.
    previous_epoch: u128,
    /// The total effective balance of all unslashed validators who attested during the _current_
    /// epoch.
    current_epoch_attesters: u128,
    /// As `current_epoch_attesters`, restricted to those who matched the target.
    current_epoch_target_attesters: u128,
    /// The total effective balance of all unslashed validators who attested during the _previous_
    /// epoch.
    previous_epoch_attesters: u128,
    /// As `previous_epoch_attesters`, restricted to those who matched the source.
    previous_epoch_source_attesters: u128,
    /// As `previous_epoch_attesters`, restricted to those who matched the target.
    previous_epoch_target_attesters: u128,
    /// As `previous_epoch_attesters`, restricted to those who matched the head.
    previous_epoch_head_attesters: u128,
}

// Generate a safe accessor for a balance in `TotalBalances`, mirroring `get_total_balance`,
// plus a `raw_` accessor for the exact sum.
macro_rules! balance_accessor {
    ($field_name:ident, $raw_name:ident) => {
        pub fn $field_name(&self) -> u128 {
            std::cmp::max(u128::from(self.effective_balance_increment), self.$field_name)
        }

        pub fn $raw_name(&self) -> u128 {
            self.$field_name
        }
    };
}

/// Checked addition for the `u128` accumulators.
fn add_to_total(total: &mut u128, amount: u128) -> Result<(), ArithError> {
    *total = total.checked_add(amount).ok_or(ArithError::Overflow)?;
    Ok(())
}

impl TotalBalances {
    pub fn new(spec: &ChainSpec) -> Self {
        Self {
            effective_balance_increment: spec.effective_balance_increment,
            current_epoch: 0,
            previous_epoch: 0,
            current_epoch_attesters: 0,
            current_epoch_target_attesters: 0,
            previous_epoch_attesters: 0,
            previous_epoch_source_attesters: 0,
            previous_epoch_target_attesters: 0,
            previous_epoch_head_attesters: 0,
        }
    }

    balance_accessor!(current_epoch, raw_current_epoch);
    balance_accessor!(previous_epoch, raw_previous_epoch);
    balance_accessor!(current_epoch_attesters, raw_current_epoch_attesters);
    balance_accessor!(
        current_epoch_target_attesters,
        raw_current_epoch_target_attesters
    );
    balance_accessor!(previous_epoch_attesters, raw_previous_epoch_attesters);
    balance_accessor!(
        previous_epoch_source_attesters,
        raw_previous_epoch_source_attesters
    );
    balance_accessor!(
        previous_epoch_target_attesters,
        raw_previous_epoch_target_attesters
    );
    balance_accessor!(
        previous_epoch_head_attesters,
        raw_previous_epoch_head_attesters
    );

    /// Add the effective balance of `status` to every total it belongs to.
    ///
    /// Only unslashed validators count towards the attester totals.
    pub fn include(&mut self, status: &ValidatorStatus) -> Result<(), Error> {
        let flags = &status.flags;
        let balance = u128::from(status.current_epoch_effective_balance);

        if flags.is_active_in_current_epoch() {
            add_to_total(&mut self.current_epoch, balance)?;
        }
        if flags.is_active_in_previous_epoch() {
            add_to_total(&mut self.previous_epoch, balance)?;
        }

        if !flags.is_slashed() {
            if flags.is_current_epoch_attester() {
                add_to_total(&mut self.current_epoch_attesters, balance)?;
            }
            if flags.is_current_epoch_target_attester() {
                add_to_total(&mut self.current_epoch_target_attesters, balance)?;
            }
            if flags.is_previous_epoch_attester() {
                add_to_total(&mut self.previous_epoch_attesters, balance)?;
            }
            if flags.is_previous_epoch_source_attester() {
                add_to_total(&mut self.previous_epoch_source_attesters, balance)?;
            }
            if flags.is_previous_epoch_target_attester() {
                add_to_total(&mut self.previous_epoch_target_attesters, balance)?;
            }
            if flags.is_previous_epoch_head_attester() {
                add_to_total(&mut self.previous_epoch_head_attesters, balance)?;
            }
        }
        Ok(())
    }

    /// Combine two partial aggregates over disjoint sets of validators.
    pub fn merge(mut self, other: &Self) -> Result<Self, Error> {
        add_to_total(&mut self.current_epoch, other.current_epoch)?;
        add_to_total(&mut self.previous_epoch, other.previous_epoch)?;
        add_to_total(
            &mut self.current_epoch_attesters,
            other.current_epoch_attesters,
        )?;
        add_to_total(
            &mut self.current_epoch_target_attesters,
            other.current_epoch_target_attesters,
        )?;
        add_to_total(
            &mut self.previous_epoch_attesters,
            other.previous_epoch_attesters,
        )?;
        add_to_total(
            &mut self.previous_epoch_source_attesters,
            other.previous_epoch_source_attesters,
        )?;
        add_to_total(
            &mut self.previous_epoch_target_attesters,
            other.previous_epoch_target_attesters,
        )?;
        add_to_total(
            &mut self.previous_epoch_head_attesters,
            other.previous_epoch_head_attesters,
        )?;
        Ok(self)
    }

    /// Check the subset ordering of the raw totals.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let chains: [&[(&'static str, u128)]; 2] = [
            &[
                (
                    "previous_epoch_head_attesters",
                    self.previous_epoch_head_attesters,
                ),
                (
                    "previous_epoch_target_attesters",
                    self.previous_epoch_target_attesters,
                ),
                (
                    "previous_epoch_source_attesters",
                    self.previous_epoch_source_attesters,
                ),
                ("previous_epoch_attesters", self.previous_epoch_attesters),
                ("previous_epoch", self.previous_epoch),
            ],
            &[
                (
                    "current_epoch_target_attesters",
                    self.current_epoch_target_attesters,
                ),
                ("current_epoch_attesters", self.current_epoch_attesters),
                ("current_epoch", self.current_epoch),
            ],
        ];

        for chain in chains {
            for pair in chain.windows(2) {
                if let [(total, lesser), (bound, greater)] = pair {
                    if lesser > greater {
                        return Err(InvariantViolation::TotalBalancesOutOfOrder {
                            total: *total,
                            bound: *bound,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Summarised information about validator participation in the _previous_ and _current_ epochs.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorStatuses {
    /// Information about each individual validator from the validator registry.
    pub statuses: Vec<ValidatorStatus>,
    /// Summed balances for various sets of validators.
    pub total_balances: TotalBalances,
}

impl ValidatorStatuses {
    /// Initializes a new instance, determining for every validator in `registry`:
    ///
    /// - Active, slashed and withdrawable status.
    /// - Participation in the current and previous epochs.
    ///
    /// Then sums the total balances and checks their ordering.
    ///
    /// Validators are processed in parallel. If more than one validator is invalid, the error for
    /// the lowest index is returned.
    pub fn new<R, C, P>(
        registry: &R,
        current_epoch_participation: &C,
        previous_epoch_participation: &P,
        ctx: &EpochContext,
        spec: &ChainSpec,
    ) -> Result<Self, Error>
    where
        R: ValidatorRegistry + Sync,
        C: ParticipationProvider + Sync,
        P: ParticipationProvider + Sync,
    {
        let _timer = metrics::start_timer(&metrics::PROCESS_EPOCH_BUILD_STATUSES_TIME);

        let num_validators = registry.num_validators();

        let statuses = (0..num_validators)
            .into_par_iter()
            .map(|index| {
                build_validator_status(
                    index,
                    registry,
                    current_epoch_participation,
                    previous_epoch_participation,
                    ctx,
                    spec,
                )
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let total_balances = statuses
            .par_iter()
            .try_fold(
                || TotalBalances::new(spec),
                |mut totals, status| {
                    totals.include(status)?;
                    Ok::<_, Error>(totals)
                },
            )
            .try_reduce(|| TotalBalances::new(spec), |a, b| a.merge(&b))?;

        total_balances.verify()?;

        // Cross-check the parallel aggregate against the registry itself.
        let summed = (0..num_validators)
            .filter_map(|index| registry.get_validator(index))
            .filter(|validator| validator.is_active_at(ctx.current_epoch()))
            .try_fold(0u128, |mut sum, validator| {
                add_to_total(&mut sum, u128::from(validator.effective_balance))?;
                Ok::<_, ArithError>(sum)
            })?;
        if summed != total_balances.raw_current_epoch() {
            return Err(InvariantViolation::ActiveBalanceMismatch {
                aggregated: total_balances.raw_current_epoch(),
                summed,
            }
            .into());
        }

        Ok(Self {
            statuses,
            total_balances,
        })
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

fn build_validator_status<R, C, P>(
    index: usize,
    registry: &R,
    current_epoch_participation: &C,
    previous_epoch_participation: &P,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<ValidatorStatus, Error>
where
    R: ValidatorRegistry,
    C: ParticipationProvider,
    P: ParticipationProvider,
{
    let len = registry.num_validators();
    let out_of_range = || Error::IndexOutOfRange { index, len };

    let validator = registry.get_validator(index).ok_or_else(out_of_range)?;
    let balance = registry.get_balance(index).ok_or_else(out_of_range)?;
    let inactivity_score = registry
        .get_inactivity_score(index)
        .ok_or_else(out_of_range)?;

    let effective_balance = validator.effective_balance;
    if effective_balance.safe_rem(spec.effective_balance_increment)? != 0
        || effective_balance > spec.max_effective_balance
    {
        return Err(InvariantViolation::InvalidEffectiveBalance {
            validator_index: index,
            effective_balance,
        }
        .into());
    }

    let current_epoch = ctx.current_epoch();
    let previous_epoch = ctx.previous_epoch();

    let mut status = ValidatorStatus {
        current_epoch_effective_balance: effective_balance,
        balance,
        inactivity_score,
        ..ValidatorStatus::default()
    };
    let flags = &mut status.flags;

    if validator.slashed {
        flags.set_slashed();
    }
    if validator.is_withdrawable_at(current_epoch) {
        flags.set_withdrawable_in_current_epoch();
    }
    if validator.is_active_at(current_epoch) {
        flags.set_active_in_current_epoch();
    }
    if validator.is_active_at(previous_epoch) {
        flags.set_active_in_previous_epoch();
    }

    let current_records = participation_records(
        current_epoch_participation,
        index,
        current_epoch,
        flags.is_active_in_current_epoch(),
    )?;
    for record in current_records {
        check_flags(record, index, current_epoch)?;
        flags.set_current_epoch_attester();
        if record.flags.is_target() {
            flags.set_current_epoch_target_attester();
        }
    }

    let previous_records = participation_records(
        previous_epoch_participation,
        index,
        previous_epoch,
        flags.is_active_in_previous_epoch(),
    )?;
    for record in previous_records {
        check_flags(record, index, previous_epoch)?;
        let inclusion_info = get_inclusion_info(record, index, len, spec)?;

        flags.set_previous_epoch_attester();
        if record.flags.is_source() {
            flags.set_previous_epoch_source_attester();
        }
        if record.flags.is_target() {
            flags.set_previous_epoch_target_attester();
        }
        if record.flags.is_head() {
            flags.set_previous_epoch_head_attester();
        }

        // Only a source-matching vote earns an inclusion reward. Keep the earliest such
        // inclusion; the first record wins a tie.
        if record.flags.is_source() {
            match status.inclusion_info.as_mut() {
                Some(existing) => existing.update(&inclusion_info),
                None => status.inclusion_info = Some(inclusion_info),
            }
        }
    }

    let flags = &status.flags;
    if flags.is_current_epoch_attester() && !flags.is_active_in_current_epoch() {
        return Err(InvariantViolation::AttesterNotActive {
            validator_index: index,
            epoch: current_epoch,
        }
        .into());
    }
    if flags.is_previous_epoch_attester() && !flags.is_active_in_previous_epoch() {
        return Err(InvariantViolation::AttesterNotActive {
            validator_index: index,
            epoch: previous_epoch,
        }
        .into());
    }

    Ok(status)
}

/// Missing data is only an error for a validator which was expected to attest.
fn participation_records<P: ParticipationProvider>(
    participation: &P,
    index: usize,
    epoch: Epoch,
    is_active: bool,
) -> Result<&[ParticipationRecord], Error> {
    match participation.participation(index) {
        Some(records) => Ok(records),
        None if is_active => Err(Error::MissingParticipationData {
            validator_index: index,
            epoch,
        }),
        None => Ok(&[]),
    }
}

fn check_flags(record: &ParticipationRecord, index: usize, epoch: Epoch) -> Result<(), Error> {
    if record.flags.is_consistent() {
        Ok(())
    } else {
        Err(InvariantViolation::InconsistentParticipationFlags {
            validator_index: index,
            epoch,
            flags: record.flags,
        }
        .into())
    }
}

fn get_inclusion_info(
    record: &ParticipationRecord,
    index: usize,
    num_validators: usize,
    spec: &ChainSpec,
) -> Result<InclusionInfo, Error> {
    let delay = record
        .inclusion_delay()
        .filter(|&delay| delay > 0 && delay >= spec.min_attestation_inclusion_delay)
        .ok_or(InvariantViolation::InvalidInclusion {
            validator_index: index,
            attestation_slot: record.attestation_slot,
            inclusion_slot: record.inclusion_slot,
        })?;

    let proposer_index = usize::try_from(record.proposer_index)
        .ok()
        .filter(|&proposer_index| proposer_index < num_validators)
        .ok_or(Error::IndexOutOfRange {
            index: usize::try_from(record.proposer_index).unwrap_or(usize::MAX),
            len: num_validators,
        })?;

    Ok(InclusionInfo {
        slot: record.inclusion_slot,
        delay,
        proposer_index,
    })
}
