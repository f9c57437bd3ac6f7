use crate::{client::relay_api::as_display, Result};
use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// Slippage tolerated when quoting top-up swaps.
pub const TOP_UP_SLIPPAGE: f64 = 0.03;

/// A constant-product liquidity pool, oriented so that token A is the input
/// side and token B the output side of the swap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pool {
    pub swap_program_id: Pubkey,
    pub account: Pubkey,
    pub authority: Pubkey,
    pub pool_token_mint: Pubkey,
    pub fee_account: Pubkey,
    pub token_account_a: Pubkey,
    pub token_account_b: Pubkey,
    pub token_a_mint: Pubkey,
    pub token_b_mint: Pubkey,
    pub token_a_balance: u64,
    pub token_b_balance: u64,
    pub fee_numerator: u64,
    pub fee_denominator: u64,
    pub owner_trade_fee_numerator: u64,
    pub owner_trade_fee_denominator: u64,
}

/// One or two pools forming a route from the paying token to native SOL.
pub type PoolsPair = Vec<Pool>;

/// External swap route provider.
#[automock]
#[async_trait]
pub trait SwapProvider: Send + Sync {
    async fn get_tradable_pools_pairs(
        &self,
        from_mint: &Pubkey,
        to_mint: &Pubkey,
    ) -> Result<Vec<PoolsPair>>;

    fn find_best_pools_pair_for_estimated_amount(
        &self,
        estimated_amount: u64,
        pools_pairs: &[PoolsPair],
    ) -> Option<PoolsPair>;
}

fn compute_fee(base_amount: u64, numerator: u64, denominator: u64) -> u64 {
    if numerator == 0 || denominator == 0 {
        return 0;
    }
    let fee = u128::from(base_amount) * u128::from(numerator) / u128::from(denominator);
    u64::try_from(fee).unwrap_or(u64::MAX)
}

fn ceiling_div(dividend: u128, divisor: u128) -> Option<u128> {
    if divisor == 0 {
        return None;
    }
    Some(dividend.div_ceil(divisor))
}

impl Pool {
    pub fn trading_fee(&self, input_amount: u64) -> u64 {
        compute_fee(input_amount, self.fee_numerator, self.fee_denominator).saturating_add(
            compute_fee(
                input_amount,
                self.owner_trade_fee_numerator,
                self.owner_trade_fee_denominator,
            ),
        )
    }

    /// Output received for `input_amount`, fees included, slippage excluded.
    #[cfg(test)]
    fn output_amount(&self, input_amount: u64) -> Option<u64> {
        let input_less_fee = input_amount.saturating_sub(self.trading_fee(input_amount));
        let invariant = u128::from(self.token_a_balance) * u128::from(self.token_b_balance);
        let new_output_balance = ceiling_div(
            invariant,
            u128::from(self.token_a_balance) + u128::from(input_less_fee),
        )?;
        u64::try_from(u128::from(self.token_b_balance).saturating_sub(new_output_balance)).ok()
    }

    /// Input needed so the swap returns exactly `estimated_amount`.
    pub fn input_amount_for_estimated_amount(&self, estimated_amount: u64) -> Option<u64> {
        if estimated_amount >= self.token_b_balance {
            return None;
        }

        let invariant = u128::from(self.token_a_balance) * u128::from(self.token_b_balance);
        let new_input_balance = ceiling_div(
            invariant,
            u128::from(self.token_b_balance - estimated_amount),
        )?;
        let input_less_fee = new_input_balance.saturating_sub(self.token_a_balance.into());

        let (ratio_numerator, ratio_denominator) = if self.owner_trade_fee_denominator == 0 {
            (
                u128::from(self.fee_denominator),
                u128::from(self.fee_denominator.saturating_sub(self.fee_numerator)),
            )
        } else {
            let fee_denominator = u128::from(self.fee_denominator);
            let owner_denominator = u128::from(self.owner_trade_fee_denominator);
            (
                fee_denominator * owner_denominator,
                (fee_denominator * owner_denominator)
                    .checked_sub(u128::from(self.fee_numerator) * owner_denominator)?
                    .checked_sub(u128::from(self.owner_trade_fee_numerator) * fee_denominator)?,
            )
        };
        if ratio_denominator == 0 {
            return None;
        }

        u64::try_from(input_less_fee * ratio_numerator / ratio_denominator).ok()
    }

    /// Input needed to receive at least `minimum_receive_amount` once
    /// `slippage` is accounted for.
    pub fn input_amount(&self, minimum_receive_amount: u64, slippage: f64) -> Option<u64> {
        if slippage >= 1.0 {
            return None;
        }
        let estimated_amount = (minimum_receive_amount as f64 / (1.0 - slippage)) as u64;
        self.input_amount_for_estimated_amount(estimated_amount)
    }

    pub fn swap_data(
        &self,
        transfer_authority: Pubkey,
        amount_in: u64,
        minimum_amount_out: u64,
    ) -> DirectSwapData {
        DirectSwapData {
            program_id: self.swap_program_id,
            account_pubkey: self.account,
            authority_pubkey: self.authority,
            transfer_authority_pubkey: transfer_authority,
            source_pubkey: self.token_account_a,
            destination_pubkey: self.token_account_b,
            pool_token_mint_pubkey: self.pool_token_mint,
            pool_fee_account_pubkey: self.fee_account,
            amount_in,
            minimum_amount_out,
        }
    }
}

/// Input needed at the head of `pools` for the route to yield at least
/// `minimum_amount_out` at its tail.
pub fn route_input_amount(pools: &[Pool], minimum_amount_out: u64, slippage: f64) -> Option<u64> {
    if pools.is_empty() {
        return None;
    }
    pools
        .iter()
        .rev()
        .try_fold(minimum_amount_out, |amount, pool| {
            pool.input_amount(amount, slippage)
        })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectSwapData {
    #[serde(serialize_with = "as_display")]
    pub program_id: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub account_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub authority_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub transfer_authority_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub source_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub destination_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub pool_token_mint_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub pool_fee_account_pubkey: Pubkey,
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitiveSwapData {
    pub from: DirectSwapData,
    pub to: DirectSwapData,
    #[serde(serialize_with = "as_display")]
    pub transit_token_mint_pubkey: Pubkey,
    pub needs_create_transit_token_account: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SwapData {
    Spl(DirectSwapData),
    SplTransitive(TransitiveSwapData),
}
