use integer_sqrt::IntegerSquareRoot;
use safe_arith::{ArithError, SafeArith};
use types::ChainSpec;

/// Returns the base reward for a validator with `effective_balance`.
pub fn get_base_reward(
    effective_balance: u64,
    // Should be == get_total_active_balance(state)
    total_active_balance: u128,
    spec: &ChainSpec,
) -> Result<u64, ArithError> {
    let sqrt_total = u64::try_from(total_active_balance.integer_sqrt())
        .map_err(|_| ArithError::Overflow)?;
    effective_balance
        .safe_mul(spec.base_reward_factor)?
        .safe_div(sqrt_total)?
        .safe_div(spec.base_rewards_per_epoch)
}

/// The number of whole `increment`s in `balance`.
pub fn balance_in_increments(balance: u128, increment: u64) -> Result<u64, ArithError> {
    let increments = balance
        .checked_div(u128::from(increment))
        .ok_or(ArithError::DivisionByZero)?;
    u64::try_from(increments).map_err(|_| ArithError::Overflow)
}

/// The share of `base_reward` paid to the proposer which included an attestation.
pub fn get_proposer_reward(base_reward: u64, spec: &ChainSpec) -> Result<u64, ArithError> {
    base_reward.safe_div(spec.proposer_reward_quotient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_base_reward() {
        let spec = ChainSpec::mainnet();
        // 32 ETH validator in a set of 1024 such validators.
        let total = 1024 * spec.max_effective_balance;
        let base_reward =
            get_base_reward(spec.max_effective_balance, u128::from(total), &spec).unwrap();
        assert_eq!(
            base_reward,
            spec.max_effective_balance * 64 / total.integer_sqrt() / 4
        );
        assert_eq!(get_proposer_reward(base_reward, &spec).unwrap(), base_reward / 8);
    }

    #[test]
    fn zero_total_is_an_error() {
        let spec = ChainSpec::mainnet();
        assert_eq!(
            get_base_reward(spec.max_effective_balance, 0, &spec),
            Err(ArithError::DivisionByZero)
        );
    }

    #[test]
    fn totals_beyond_u64_are_supported() {
        let spec = ChainSpec::mainnet();
        // 2^40 validators at the maximum effective balance.
        let total = u128::from(spec.max_effective_balance) << 40;
        assert!(total > u128::from(u64::MAX));

        let base_reward = get_base_reward(spec.max_effective_balance, total, &spec).unwrap();
        assert_eq!(
            u128::from(base_reward),
            u128::from(spec.max_effective_balance * 64) / total.integer_sqrt() / 4
        );
        assert_eq!(
            balance_in_increments(total, spec.effective_balance_increment),
            Ok(32 << 40)
        );
    }

    #[test]
    fn increments_overflowing_u64_are_an_error() {
        assert_eq!(
            balance_in_increments(u128::MAX, 1),
            Err(ArithError::Overflow)
        );
        assert_eq!(
            balance_in_increments(1, 0),
            Err(ArithError::DivisionByZero)
        );
    }
}
