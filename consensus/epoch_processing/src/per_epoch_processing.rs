#![deny(clippy::wildcard_imports)]

pub use effective_balance_updates::process_effective_balance_updates;
pub use epoch_context::EpochContext;
pub use epoch_processing_summary::EpochProcessingSummary;
use errors::EpochProcessingError as Error;
pub use errors::InvariantViolation;
pub use inactivity_updates::process_inactivity_updates;
pub use rewards_and_penalties::{
    process_rewards_and_penalties, AttestationDelta, BalanceTransition, Delta, Rewards,
};
pub use validator_statuses::{
    InclusionInfo, StatusFlags, TotalBalances, ValidatorStatus, ValidatorStatuses,
};

use crate::metrics;
use slog::{debug, error, Logger};
use types::{ChainSpec, ParticipationProvider, ValidatorRegistry, ValidatorRegistryMut};

pub mod effective_balance_updates;
pub mod epoch_context;
pub mod epoch_processing_summary;
pub mod errors;
pub mod inactivity_updates;
pub mod rewards_and_penalties;
pub mod validator_statuses;

/// The complete, not yet applied, result of one epoch transition.
///
/// All per-validator vectors are index-aligned with the registry the transition was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochTransition {
    context: EpochContext,
    rewards: Rewards,
    effective_balances: Vec<u64>,
    inactivity_scores: Vec<u64>,
    summary: EpochProcessingSummary,
}

impl EpochTransition {
    pub fn context(&self) -> &EpochContext {
        &self.context
    }

    /// Per-component deltas for every validator.
    pub fn deltas(&self) -> &[AttestationDelta] {
        &self.rewards.deltas
    }

    /// Balances before and after rewards and penalties.
    pub fn balances(&self) -> &[BalanceTransition] {
        &self.rewards.balances
    }

    pub fn effective_balances(&self) -> &[u64] {
        &self.effective_balances
    }

    pub fn inactivity_scores(&self) -> &[u64] {
        &self.inactivity_scores
    }

    pub fn summary(&self) -> &EpochProcessingSummary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.rewards.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.balances.is_empty()
    }

    /// Write the new balances, effective balances and inactivity scores into `registry`.
    ///
    /// Every index is checked before anything is written, so on error `registry` is untouched.
    pub fn commit<R: ValidatorRegistryMut>(
        self,
        registry: &mut R,
    ) -> Result<EpochProcessingSummary, Error> {
        let len = self.len();
        let registry_len = registry.num_validators();
        if registry_len != len {
            return Err(Error::IndexOutOfRange {
                index: std::cmp::max(registry_len, len).saturating_sub(1),
                len: std::cmp::min(registry_len, len),
            });
        }
        if let Some(index) = (0..len).find(|&index| {
            registry.get_validator(index).is_none()
                || registry.get_balance(index).is_none()
                || registry.get_inactivity_score(index).is_none()
        }) {
            return Err(Error::IndexOutOfRange { index, len });
        }

        let out_of_range = |index| Error::IndexOutOfRange { index, len };
        for (index, ((balance, effective_balance), inactivity_score)) in self
            .rewards
            .balances
            .iter()
            .zip(&self.effective_balances)
            .zip(&self.inactivity_scores)
            .enumerate()
        {
            *registry
                .get_balance_mut(index)
                .ok_or_else(|| out_of_range(index))? = balance.after;
            registry
                .get_validator_mut(index)
                .ok_or_else(|| out_of_range(index))?
                .effective_balance = *effective_balance;
            *registry
                .get_inactivity_score_mut(index)
                .ok_or_else(|| out_of_range(index))? = *inactivity_score;
        }

        Ok(self.summary)
    }
}

/// Performs the accounting stage of per-epoch processing.
///
/// The registry is only read. Nothing is applied until the returned `EpochTransition` is
/// committed, so an error leaves the registry exactly as it was.
pub fn process_epoch<R, C, P>(
    registry: &R,
    current_epoch_participation: &C,
    previous_epoch_participation: &P,
    ctx: &EpochContext,
    spec: &ChainSpec,
    log: &Logger,
) -> Result<EpochTransition, Error>
where
    R: ValidatorRegistry + Sync,
    C: ParticipationProvider + Sync,
    P: ParticipationProvider + Sync,
{
    let _timer = metrics::start_timer(&metrics::PROCESS_EPOCH_TIME);

    debug!(
        log,
        "Processing epoch";
        "epoch" => ctx.current_epoch(),
        "fork" => %ctx.fork_name(),
        "validator_count" => registry.num_validators(),
        "finalized_epoch" => ctx.finalized_epoch(),
        "finality_delay" => ctx.finality_delay(),
        "in_inactivity_leak" => ctx.is_in_inactivity_leak(),
    );

    let result = process_epoch_inner(
        registry,
        current_epoch_participation,
        previous_epoch_participation,
        ctx,
        spec,
    );

    match &result {
        Ok(transition) => {
            let summary = transition.summary();
            debug!(
                log,
                "Processed epoch";
                "epoch" => ctx.current_epoch(),
                "current_epoch_active_gwei" => %summary.current_epoch_total_active_balance(),
                "previous_epoch_target_gwei" => %summary.previous_epoch_target_attesting_balance(),
                "previous_epoch_head_gwei" => %summary.previous_epoch_head_attesting_balance(),
            );
        }
        Err(e) => {
            metrics::inc_counter(&metrics::PROCESS_EPOCH_ERRORS_TOTAL);
            error!(
                log,
                "Epoch processing failed";
                "epoch" => ctx.current_epoch(),
                "error" => ?e,
            );
        }
    }

    result
}

fn process_epoch_inner<R, C, P>(
    registry: &R,
    current_epoch_participation: &C,
    previous_epoch_participation: &P,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<EpochTransition, Error>
where
    R: ValidatorRegistry + Sync,
    C: ParticipationProvider + Sync,
    P: ParticipationProvider + Sync,
{
    // Pre-compute validator statuses and total balances.
    let validator_statuses = ValidatorStatuses::new(
        registry,
        current_epoch_participation,
        previous_epoch_participation,
        ctx,
        spec,
    )?;
    update_participation_metrics(&validator_statuses.total_balances);

    // Rewards and Penalties.
    let rewards = process_rewards_and_penalties(&validator_statuses, ctx, spec)?;

    // Update effective balances with hysteresis (lag).
    let effective_balances =
        process_effective_balance_updates(&validator_statuses, &rewards.balances, spec)?;

    let inactivity_scores = process_inactivity_updates(&validator_statuses, ctx, spec)?;

    let expected = validator_statuses.len();
    for found in [
        rewards.deltas.len(),
        effective_balances.len(),
        inactivity_scores.len(),
    ] {
        if found != expected {
            return Err(InvariantViolation::InconsistentLengths { expected, found }.into());
        }
    }

    let ValidatorStatuses {
        statuses,
        total_balances,
    } = validator_statuses;

    Ok(EpochTransition {
        context: *ctx,
        rewards,
        effective_balances,
        inactivity_scores,
        summary: EpochProcessingSummary::new(total_balances, statuses),
    })
}

fn update_participation_metrics(total_balances: &TotalBalances) {
    metrics::set_gauge_u128(
        &metrics::PARTICIPATION_CURR_EPOCH_ACTIVE_GWEI_TOTAL,
        total_balances.raw_current_epoch(),
    );
    metrics::set_gauge_u128(
        &metrics::PARTICIPATION_PREV_EPOCH_ACTIVE_GWEI_TOTAL,
        total_balances.raw_previous_epoch(),
    );
    metrics::set_gauge_u128(
        &metrics::PARTICIPATION_PREV_EPOCH_TARGET_ATTESTING_GWEI_TOTAL,
        total_balances.raw_previous_epoch_target_attesters(),
    );
    metrics::set_gauge_u128(
        &metrics::PARTICIPATION_PREV_EPOCH_HEAD_ATTESTING_GWEI_TOTAL,
        total_balances.raw_previous_epoch_head_attesters(),
    );
}
