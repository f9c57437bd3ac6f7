use std::{
    iter::Sum,
    ops::{Add, AddAssign},
};

/// Lamport cost of a transaction, split between signature fees and the
/// balances required for newly created accounts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeeAmount {
    pub transaction: u64,
    pub account_balances: u64,
}

impl FeeAmount {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(transaction: u64, account_balances: u64) -> Self {
        Self {
            transaction,
            account_balances,
        }
    }

    pub const fn zero() -> Self {
        Self::ZERO
    }

    pub fn total(&self) -> u64 {
        self.transaction.saturating_add(self.account_balances)
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl Add for FeeAmount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            transaction: self.transaction.saturating_add(rhs.transaction),
            account_balances: self.account_balances.saturating_add(rhs.account_balances),
        }
    }
}

impl AddAssign for FeeAmount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for FeeAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_and_sum() {
        let fees = [
            FeeAmount::new(5_000, 2_039_280),
            FeeAmount::new(10_000, 0),
            FeeAmount::zero(),
        ];

        let sum: FeeAmount = fees.into_iter().sum();
        assert_eq!(sum, FeeAmount::new(15_000, 2_039_280));
        assert_eq!(sum.total(), 2_054_280);
        assert!(FeeAmount::ZERO.is_zero());
        assert!(!sum.is_zero());
    }

    #[test]
    fn test_add_saturates() {
        let mut fee = FeeAmount::new(u64::MAX, 1);
        fee += FeeAmount::new(1, 1);
        assert_eq!(fee, FeeAmount::new(u64::MAX, 2));
        assert_eq!(FeeAmount::new(u64::MAX, 1).total(), u64::MAX);
    }
}
