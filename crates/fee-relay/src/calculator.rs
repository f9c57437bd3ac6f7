use crate::{
    context::{RelayAccountStatus, RelayContext},
    fee::FeeAmount,
    swap::{route_input_amount, SwapProvider, TOP_UP_SLIPPAGE},
    token::NATIVE_MINT,
    Result,
};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Smallest top-up worth swapping for, in lamports.
pub const MINIMUM_TOP_UP_AMOUNT: u64 = 10_000;

#[async_trait]
pub trait RelayFeeCalculator: Send + Sync {
    /// Lamports that must be swapped into the relay account so it can front
    /// `expected_fee`. `None` or the native mint means the user pays natively
    /// and nothing is needed.
    fn calculate_needed_top_up_amount(
        &self,
        context: &RelayContext,
        expected_fee: FeeAmount,
        paying_token_mint: Option<&Pubkey>,
    ) -> FeeAmount;

    /// Converts a lamport-denominated fee into units of `paying_token_mint`.
    /// Returns `None` when no swap route exists.
    async fn calculate_fee_in_paying_token(
        &self,
        swap_provider: &dyn SwapProvider,
        fee_in_sol: FeeAmount,
        paying_token_mint: &Pubkey,
    ) -> Result<Option<FeeAmount>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRelayFeeCalculator;

impl DefaultRelayFeeCalculator {
    fn calculate_min_top_up_amount(context: &RelayContext, expected_fee: FeeAmount) -> FeeAmount {
        let usage = &context.usage_status;
        let mut needed = expected_fee;

        // The top-up transaction itself costs two signatures unless covered.
        let top_up_network_fee = context.top_up_network_fee();
        let top_up_fee = if usage.is_free_transaction_fee_available(top_up_network_fee) {
            0
        } else {
            top_up_network_fee
        };

        // Waiver for the user's transactions is judged against usage after
        // the top-up has been counted.
        let after_top_up = usage.recorded(top_up_network_fee);
        let transaction_fee =
            if after_top_up.is_free_transaction_fee_available(expected_fee.transaction) {
                0
            } else {
                expected_fee.transaction
            };

        needed.transaction = top_up_fee.saturating_add(transaction_fee);
        if needed.is_zero() {
            return needed;
        }

        let minimum_relay_balance = context.minimum_relay_account_balance;
        match context.relay_account_status {
            RelayAccountStatus::NotYetCreated => {
                needed.account_balances =
                    needed.account_balances.saturating_add(minimum_relay_balance);
            }
            RelayAccountStatus::Created { balance } if balance < minimum_relay_balance => {
                needed.account_balances = needed
                    .account_balances
                    .saturating_add(minimum_relay_balance - balance);
            }
            RelayAccountStatus::Created { balance } => {
                let mut available = balance - minimum_relay_balance;
                if available >= needed.transaction {
                    available -= needed.transaction;
                    needed.transaction = 0;
                    needed.account_balances = needed.account_balances.saturating_sub(available);
                } else {
                    needed.transaction -= available;
                }
            }
        }

        needed
    }
}

#[async_trait]
impl RelayFeeCalculator for DefaultRelayFeeCalculator {
    fn calculate_needed_top_up_amount(
        &self,
        context: &RelayContext,
        expected_fee: FeeAmount,
        paying_token_mint: Option<&Pubkey>,
    ) -> FeeAmount {
        match paying_token_mint {
            None => return FeeAmount::ZERO,
            Some(mint) if *mint == NATIVE_MINT => return FeeAmount::ZERO,
            Some(_) => {}
        }

        let mut amount = Self::calculate_min_top_up_amount(context, expected_fee);
        let total = amount.total();
        if total > 0 && total < MINIMUM_TOP_UP_AMOUNT {
            amount.transaction += MINIMUM_TOP_UP_AMOUNT - total;
        }

        debug!(
            transaction = amount.transaction,
            account_balances = amount.account_balances,
            "top-up amount calculated"
        );
        amount
    }

    async fn calculate_fee_in_paying_token(
        &self,
        swap_provider: &dyn SwapProvider,
        fee_in_sol: FeeAmount,
        paying_token_mint: &Pubkey,
    ) -> Result<Option<FeeAmount>> {
        if *paying_token_mint == NATIVE_MINT {
            return Ok(Some(fee_in_sol));
        }

        let pools_pairs = swap_provider
            .get_tradable_pools_pairs(paying_token_mint, &NATIVE_MINT)
            .await?;
        let Some(pools) = swap_provider
            .find_best_pools_pair_for_estimated_amount(fee_in_sol.total(), &pools_pairs)
        else {
            return Ok(None);
        };

        let convert = |lamports: u64| {
            if lamports == 0 {
                Some(0)
            } else {
                route_input_amount(&pools, lamports, TOP_UP_SLIPPAGE)
            }
        };

        Ok(convert(fee_in_sol.transaction)
            .zip(convert(fee_in_sol.account_balances))
            .map(|(transaction, account_balances)| FeeAmount::new(transaction, account_balances)))
    }
}
