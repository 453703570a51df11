use super::{EpochContext, Error, ValidatorStatuses};
use crate::metrics;
use safe_arith::SafeArith;
use std::cmp::min;
use types::ChainSpec;

/// Compute the inactivity score of every validator after this epoch.
///
/// Scores are only updated once the fork uses them, and never at the genesis epoch; otherwise
/// they pass through unchanged.
pub fn process_inactivity_updates(
    validator_statuses: &ValidatorStatuses,
    ctx: &EpochContext,
    spec: &ChainSpec,
) -> Result<Vec<u64>, Error> {
    let _timer = metrics::start_timer(&metrics::PROCESS_EPOCH_INACTIVITY_UPDATES_TIME);

    let statuses = validator_statuses.statuses.iter();

    // Score updates based on previous epoch participation, skip genesis epoch
    if !ctx.fork_name().uses_inactivity_scores() || ctx.is_genesis_epoch(spec) {
        return Ok(statuses.map(|status| status.inactivity_score).collect());
    }

    statuses
        .map(|status| -> Result<u64, Error> {
            let mut inactivity_score = status.inactivity_score;
            if !status.is_eligible() {
                return Ok(inactivity_score);
            }

            // Increase inactivity score of inactive validators
            if status.is_unslashed_previous_epoch_target_attester() {
                inactivity_score.safe_sub_assign(min(1, inactivity_score))?;
            } else {
                inactivity_score = min(
                    inactivity_score.saturating_add(spec.inactivity_score_bias),
                    spec.max_inactivity_score,
                );
            }

            // Decrease the score of all validators for forgiveness when not during a leak
            if !ctx.is_in_inactivity_leak() {
                inactivity_score
                    .safe_sub_assign(min(spec.inactivity_score_recovery_rate, inactivity_score))?;
            }

            Ok(inactivity_score)
        })
        .collect()
}
