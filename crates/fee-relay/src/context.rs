use crate::client::relay_api::FeeLimitForAuthorityResponse;
use solana_sdk::pubkey::Pubkey;

/// Whether the user's relay account exists, with its lamport balance if so.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayAccountStatus {
    NotYetCreated,
    Created { balance: u64 },
}

impl RelayAccountStatus {
    pub fn balance(&self) -> Option<u64> {
        match self {
            Self::NotYetCreated => None,
            Self::Created { balance } => Some(*balance),
        }
    }
}

impl From<Option<u64>> for RelayAccountStatus {
    fn from(balance: Option<u64>) -> Self {
        balance.map_or(Self::NotYetCreated, |balance| Self::Created { balance })
    }
}

/// The user's free transaction quota for the current period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UsageStatus {
    pub max_usage: u64,
    pub current_usage: u64,
    pub max_amount: u64,
    pub amount_used: u64,
}

impl UsageStatus {
    /// A network fee of `fee` lamports is covered by the quota when a slot is
    /// left and the amount cap would not be exceeded.
    pub fn is_free_transaction_fee_available(&self, fee: u64) -> bool {
        self.current_usage < self.max_usage
            && self.amount_used.saturating_add(fee) <= self.max_amount
    }

    /// Usage after one more relayed transaction costing `fee` lamports.
    pub fn recorded(&self, fee: u64) -> Self {
        Self {
            current_usage: self.current_usage.saturating_add(1),
            amount_used: self.amount_used.saturating_add(fee),
            ..*self
        }
    }
}

impl From<&FeeLimitForAuthorityResponse> for UsageStatus {
    fn from(response: &FeeLimitForAuthorityResponse) -> Self {
        Self {
            max_usage: if response.limits.use_free_fee {
                response.limits.max_fee_count
            } else {
                0
            },
            current_usage: response.processed_fee.fee_count,
            max_amount: response.limits.max_fee_amount,
            amount_used: response.processed_fee.total_fee_amount,
        }
    }
}

/// Snapshot of everything needed to price and build relayed transactions.
/// Snapshots are immutable values: updates produce a new snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayContext {
    pub minimum_token_account_balance: u64,
    pub minimum_relay_account_balance: u64,
    pub fee_payer_address: Pubkey,
    pub lamports_per_signature: u64,
    pub relay_account_status: RelayAccountStatus,
    pub usage_status: UsageStatus,
}

impl RelayContext {
    /// Network fee of a top-up transaction: the relay fee payer and the
    /// owner both sign it.
    pub fn top_up_network_fee(&self) -> u64 {
        self.lamports_per_signature.saturating_mul(2)
    }

    pub fn with_usage_recorded(&self, fee: u64) -> Self {
        Self {
            usage_status: self.usage_status.recorded(fee),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(max_usage: u64, current_usage: u64, max_amount: u64, amount_used: u64) -> UsageStatus {
        UsageStatus {
            max_usage,
            current_usage,
            max_amount,
            amount_used,
        }
    }

    #[test]
    fn test_free_transaction_fee_available() {
        assert!(usage(100, 0, 10_000_000, 0).is_free_transaction_fee_available(10_000));
        assert!(usage(100, 99, 10_000, 5_000).is_free_transaction_fee_available(5_000));
        assert!(!usage(100, 100, 10_000_000, 0).is_free_transaction_fee_available(0));
        assert!(!usage(100, 0, 10_000, 5_001).is_free_transaction_fee_available(5_000));
        assert!(!usage(0, 0, 0, 0).is_free_transaction_fee_available(0));
    }

    #[test]
    fn test_usage_recorded_leaves_original_untouched() {
        let context = RelayContext {
            minimum_token_account_balance: 2_039_280,
            minimum_relay_account_balance: 890_880,
            fee_payer_address: Pubkey::new_unique(),
            lamports_per_signature: 5_000,
            relay_account_status: RelayAccountStatus::NotYetCreated,
            usage_status: usage(100, 0, 10_000_000, 0),
        };

        let updated = context.with_usage_recorded(context.top_up_network_fee());

        assert_eq!(context.usage_status.current_usage, 0);
        assert_eq!(updated.usage_status.current_usage, 1);
        assert_eq!(updated.usage_status.amount_used, 10_000);
        assert_eq!(updated.fee_payer_address, context.fee_payer_address);
    }

    #[test]
    fn test_relay_account_status_from_balance() {
        assert_eq!(
            RelayAccountStatus::from(None),
            RelayAccountStatus::NotYetCreated
        );
        assert_eq!(
            RelayAccountStatus::from(Some(0)).balance(),
            Some(0)
        );
    }
}
