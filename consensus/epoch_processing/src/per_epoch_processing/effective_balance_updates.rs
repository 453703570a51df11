use super::{BalanceTransition, Error, InvariantViolation, ValidatorStatuses};
use crate::metrics;
use safe_arith::SafeArith;
use std::cmp::min;
use types::ChainSpec;

/// Update effective balances with hysteresis (lag), returning the new effective balance of every
/// validator.
pub fn process_effective_balance_updates(
    validator_statuses: &ValidatorStatuses,
    balances: &[BalanceTransition],
    spec: &ChainSpec,
) -> Result<Vec<u64>, Error> {
    let _timer = metrics::start_timer(&metrics::PROCESS_EPOCH_EFFECTIVE_BALANCE_UPDATES_TIME);

    if balances.len() != validator_statuses.len() {
        return Err(InvariantViolation::InconsistentLengths {
            expected: validator_statuses.len(),
            found: balances.len(),
        }
        .into());
    }

    validator_statuses
        .statuses
        .iter()
        .zip(balances)
        .map(|(status, balance)| {
            get_new_effective_balance(status.current_epoch_effective_balance, balance.after, spec)
        })
        .collect()
}

/// The effective balance a validator with `effective_balance` should have once its balance
/// becomes `balance`.
pub fn get_new_effective_balance(
    effective_balance: u64,
    balance: u64,
    spec: &ChainSpec,
) -> Result<u64, Error> {
    let hysteresis_increment = spec
        .effective_balance_increment
        .safe_div(spec.hysteresis_quotient)?;
    let downward_threshold = hysteresis_increment.safe_mul(spec.hysteresis_downward_multiplier)?;
    let upward_threshold = hysteresis_increment.safe_mul(spec.hysteresis_upward_multiplier)?;

    if balance.safe_add(downward_threshold)? < effective_balance
        || effective_balance.safe_add(upward_threshold)? < balance
    {
        Ok(min(
            balance.safe_sub(balance.safe_rem(spec.effective_balance_increment)?)?,
            spec.max_effective_balance,
        ))
    } else {
        Ok(effective_balance)
    }
}
