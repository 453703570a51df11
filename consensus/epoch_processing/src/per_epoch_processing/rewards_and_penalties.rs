use super::{
    EpochContext, Error, InvariantViolation, TotalBalances, ValidatorStatus, ValidatorStatuses,
};
use crate::common::{
    base::{balance_in_increments, get_base_reward, get_proposer_reward},
    decrease_balance_directly, increase_balance_directly,
};
use crate::metrics;
use rayon::prelude::*;
use safe_arith::SafeArith;
use types::{ChainSpec, ForkName};

#[cfg(feature = "arbitrary-fuzz")]
use arbitrary::Arbitrary;

/// Use to track the changes to a validator's balance.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delta {
    pub rewards: u64,
    pub penalties: u64,
}

impl Delta {
    /// Reward the validator with the `reward`.
    pub fn reward(&mut self, reward: u64) -> Result<(), Error> {
        self.rewards = self.rewards.safe_add(reward)?;
        Ok(())
    }

    /// Penalize the validator with the `penalty`.
    pub fn penalize(&mut self, penalty: u64) -> Result<(), Error> {
        self.penalties = self.penalties.safe_add(penalty)?;
        Ok(())
    }

    /// Combine two deltas.
    fn combine(&mut self, other: Delta) -> Result<(), Error> {
        self.reward(other.rewards)?;
        self.penalize(other.penalties)
    }
}

/// Apply the deltas to a balance: rewards error on overflow, penalties saturate at zero.
fn apply_delta(balance: u64, delta: Delta) -> Result<u64, Error> {
    let mut balance = balance;
    increase_balance_directly(&mut balance, delta.rewards)?;
    decrease_balance_directly(&mut balance, delta.penalties);
    Ok(balance)
}

/// Per-component breakdown of the deltas for a single validator.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttestationDelta {
    pub source_delta: Delta,
    pub target_delta: Delta,
    pub head_delta: Delta,
    pub inclusion_delay_delta: Delta,
    /// Rewards for including other validators' attestations as a proposer.
    pub proposer_delta: Delta,
    pub inactivity_penalty_delta: Delta,
}

impl AttestationDelta {
    /// Flatten into a single delta.
    pub fn flatten(self) -> Result<Delta, Error> {
        let AttestationDelta {
            source_delta,
            target_delta,
            head_delta,
            inclusion_delay_delta,
            proposer_delta,
            inactivity_penalty_delta,
        } = self;
        let mut result = Delta::default();
        for delta in [
            source_delta,
            target_delta,
            head_delta,
            inclusion_delay_delta,
            proposer_delta,
            inactivity_penalty_delta,
        ] {
            result.combine(delta)?;
        }
        Ok(result)
    }
}

/// A validator's balance either side of the epoch transition.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceTransition {
    pub before: u64,
    pub after: u64,
}

impl BalanceTransition {
    /// The signed change in balance.
    pub fn change(&self) -> i128 {
        i128::from(self.after).saturating_sub(i128::from(self.before))
    }
}

/// Output of the reward and penalty calculation, index-aligned with the validator statuses.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Rewards {
    pub deltas: Vec<AttestationDelta>,
    pub balances: Vec<BalanceTransition>,
}

/// Compute attester and proposer rewards and penalties for every validator.
///
/// At the genesis epoch every delta is zero and every balance is unchanged.
pub fn process_rewards_and_penalties(
    validator_statuses: &ValidatorStatuses,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<Rewards, Error> {
    let _timer = metrics::start_timer(&metrics::PROCESS_EPOCH_REWARDS_AND_PENALTIES_TIME);

    let deltas = if ctx.is_genesis_epoch(spec) {
        vec![AttestationDelta::default(); validator_statuses.len()]
    } else {
        get_attestation_deltas(validator_statuses, ctx, spec)?
    };

    if deltas.len() != validator_statuses.len() {
        return Err(InvariantViolation::InconsistentLengths {
            expected: validator_statuses.len(),
            found: deltas.len(),
        }
        .into());
    }

    let balances = validator_statuses
        .statuses
        .iter()
        .zip(deltas.iter())
        .map(|(status, delta)| -> Result<BalanceTransition, Error> {
            let before = status.balance;
            let after = apply_delta(before, delta.flatten()?)?;
            Ok(BalanceTransition { before, after })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Rewards { deltas, balances })
}

/// Compute the attestation deltas for every validator.
///
/// Each validator's own deltas are independent and computed in parallel. Proposer rewards are
/// credited afterwards, in validator index order.
pub fn get_attestation_deltas(
    validator_statuses: &ValidatorStatuses,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<Vec<AttestationDelta>, Error> {
    let total_balances = &validator_statuses.total_balances;
    let statuses = &validator_statuses.statuses;

    let mut deltas = statuses
        .par_iter()
        .enumerate()
        .map(|(index, status)| get_attestation_delta(index, status, total_balances, ctx, spec))
        .collect::<Vec<_>>()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let len = deltas.len();
    for status in statuses {
        if !status.is_unslashed_previous_epoch_source_attester() {
            continue;
        }
        let Some(inclusion_info) = status.inclusion_info else {
            continue;
        };
        let base_reward = get_base_reward(
            status.current_epoch_effective_balance,
            total_balances.current_epoch(),
            spec,
        )?;
        let proposer_reward = get_proposer_reward(base_reward, spec)?;
        deltas
            .get_mut(inclusion_info.proposer_index)
            .ok_or(Error::IndexOutOfRange {
                index: inclusion_info.proposer_index,
                len,
            })?
            .proposer_delta
            .reward(proposer_reward)?;
    }

    Ok(deltas)
}

/// The deltas earned by a single validator for its own attestation, excluding anything it earns
/// as a proposer.
pub fn get_attestation_delta(
    index: usize,
    status: &ValidatorStatus,
    total_balances: &TotalBalances,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<AttestationDelta, Error> {
    let mut delta = AttestationDelta::default();

    // Is this validator eligible to be rewarded or penalized?
    if !status.is_eligible() {
        return Ok(delta);
    }

    let effective_balance = status.current_epoch_effective_balance;
    let total_balance = total_balances.current_epoch();
    let base_reward = get_base_reward(effective_balance, total_balance, spec)?;

    delta.source_delta = get_attestation_component_delta(
        status.is_unslashed_previous_epoch_source_attester(),
        total_balances.previous_epoch_source_attesters(),
        total_balance,
        base_reward,
        ctx,
        spec,
    )?;
    delta.target_delta = get_attestation_component_delta(
        status.is_unslashed_previous_epoch_target_attester(),
        total_balances.previous_epoch_target_attesters(),
        total_balance,
        base_reward,
        ctx,
        spec,
    )?;
    delta.head_delta = get_attestation_component_delta(
        status.is_unslashed_previous_epoch_head_attester(),
        total_balances.previous_epoch_head_attesters(),
        total_balance,
        base_reward,
        ctx,
        spec,
    )?;

    let proposer_reward = get_proposer_reward(base_reward, spec)?;

    if status.is_unslashed_previous_epoch_source_attester() {
        let inclusion_info = status
            .inclusion_info
            .ok_or(InvariantViolation::MissingInclusionInfo(index))?;
        let max_attester_reward = base_reward.safe_sub(proposer_reward)?;
        delta
            .inclusion_delay_delta
            .reward(max_attester_reward.safe_div(inclusion_info.delay)?)?;
    }

    if ctx.is_in_inactivity_leak() {
        delta.inactivity_penalty_delta =
            get_inactivity_penalty_delta(status, base_reward, proposer_reward, ctx, spec)?;
    }

    Ok(delta)
}

fn get_attestation_component_delta(
    is_unslashed_attester: bool,
    attesting_balance: u128,
    total_balance: u128,
    base_reward: u64,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<Delta, Error> {
    let mut delta = Delta::default();

    if is_unslashed_attester {
        if ctx.is_in_inactivity_leak() {
            // Since full base reward will be canceled out by inactivity penalty deltas,
            // optimal participation receives full base reward compensation here.
            match ctx.fork_name() {
                ForkName::Base => delta.reward(base_reward)?,
                ForkName::Altair => (),
            }
        } else {
            let increment = spec.effective_balance_increment;
            let reward_numerator =
                base_reward.safe_mul(balance_in_increments(attesting_balance, increment)?)?;
            delta.reward(
                reward_numerator.safe_div(balance_in_increments(total_balance, increment)?)?,
            )?;
        }
    } else {
        delta.penalize(base_reward)?;
    }

    Ok(delta)
}

fn get_inactivity_penalty_delta(
    status: &ValidatorStatus,
    base_reward: u64,
    proposer_reward: u64,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<Delta, Error> {
    let mut delta = Delta::default();
    let effective_balance = status.current_epoch_effective_balance;
    let missed_target = !status.is_unslashed_previous_epoch_target_attester();

    match ctx.fork_name() {
        ForkName::Base => {
            // If the validator is eligible, penalize it for everything but the proposer share of
            // an optimal attestation.
            delta.penalize(
                spec.base_rewards_per_epoch
                    .safe_mul(base_reward)?
                    .safe_sub(proposer_reward)?,
            )?;

            // Additionally, all validators whose FFG target didn't match are penalized extra.
            if missed_target {
                delta.penalize(
                    effective_balance
                        .safe_mul(ctx.finality_delay())?
                        .safe_div(spec.inactivity_penalty_quotient_for_fork(ForkName::Base))?,
                )?;
            }
        }
        ForkName::Altair => {
            if missed_target {
                let penalty_numerator = effective_balance.safe_mul(status.inactivity_score)?;
                let penalty_denominator = spec
                    .inactivity_score_bias
                    .safe_mul(spec.inactivity_penalty_quotient_for_fork(ForkName::Altair))?;
                delta.penalize(penalty_numerator.safe_div(penalty_denominator)?)?;
            }
        }
    }

    Ok(delta)
}
