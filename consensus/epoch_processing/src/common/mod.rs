pub mod base;

use safe_arith::{ArithError, SafeArith};

/// Increase the balance of a validator, erroring upon overflow.
pub fn increase_balance_directly(balance: &mut u64, delta: u64) -> Result<(), ArithError> {
    balance.safe_add_assign(delta)
}

/// Decrease the balance of a validator, saturating upon overflow.
pub fn decrease_balance_directly(balance: &mut u64, delta: u64) {
    *balance = balance.saturating_sub(delta);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increase_errors_on_overflow() {
        let mut balance = u64::MAX - 1;
        assert_eq!(increase_balance_directly(&mut balance, 1), Ok(()));
        assert_eq!(
            increase_balance_directly(&mut balance, 1),
            Err(ArithError::Overflow)
        );
        assert_eq!(balance, u64::MAX);
    }

    #[test]
    fn decrease_saturates() {
        let mut balance = 5;
        decrease_balance_directly(&mut balance, 7);
        assert_eq!(balance, 0);
    }
}
