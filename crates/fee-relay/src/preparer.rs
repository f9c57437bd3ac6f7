use crate::{
    client::{account::require_account, AccountStorage},
    context::{RelayAccountStatus, RelayContext},
    network::Network,
    program,
    token::PayingFeeToken,
    transaction::PreparedTransaction,
    Error, Result,
};
use solana_sdk::signer::Signer;
use solana_system_interface::instruction as system_instruction;
use std::sync::Arc;
use tracing::debug;

/// Appends the instructions that reimburse the relay fee payer to a user
/// transaction.
pub struct TransactionPreparer {
    account_storage: Arc<dyn AccountStorage>,
    network: Network,
}

impl TransactionPreparer {
    pub fn new(account_storage: Arc<dyn AccountStorage>, network: Network) -> Self {
        Self {
            account_storage,
            network,
        }
    }

    /// Lamports owed back to the fee payer for `transaction`: its account
    /// balances, its network fee unless the quota covers it, and
    /// `additional_payback_fee`.
    pub fn payback_fee(
        context: &RelayContext,
        transaction: &PreparedTransaction,
        additional_payback_fee: u64,
    ) -> u64 {
        let expected_fee = transaction.expected_fee();
        let mut payback_fee = additional_payback_fee.saturating_add(expected_fee.account_balances);
        if !context
            .usage_status
            .is_free_transaction_fee_available(expected_fee.transaction)
        {
            payback_fee = payback_fee.saturating_add(expected_fee.transaction);
        }
        payback_fee
    }

    /// Returns a copy of `transaction` carrying the payback instructions,
    /// re-signed by its local signers. The input is left untouched.
    pub fn prepare(
        &self,
        context: &RelayContext,
        transaction: &PreparedTransaction,
        paying_fee_token: &PayingFeeToken,
        relay_account_status: &RelayAccountStatus,
        additional_payback_fee: u64,
        auto_payback: bool,
    ) -> Result<PreparedTransaction> {
        let fee_payer = context.fee_payer_address;
        if *transaction.fee_payer() != fee_payer {
            return Err(Error::InvalidFeePayer);
        }

        let payback_fee = Self::payback_fee(context, transaction, additional_payback_fee);
        if !auto_payback || payback_fee == 0 {
            return Ok(transaction.clone());
        }

        let owner = require_account(self.account_storage.as_ref())?;
        let owner_pubkey = owner.pubkey();
        let mut instructions = Vec::with_capacity(2);

        let relay_balance = relay_account_status.balance().unwrap_or_default();
        if paying_fee_token.is_native() && relay_balance < payback_fee {
            instructions.push(system_instruction::transfer(
                &owner_pubkey,
                &fee_payer,
                payback_fee,
            ));
        } else {
            let relay_payback = payback_fee - additional_payback_fee;
            if relay_payback > 0 {
                instructions.push(program::transfer_sol(
                    &owner_pubkey,
                    &fee_payer,
                    relay_payback,
                    self.network,
                )?);
            }
            if additional_payback_fee > 0 {
                instructions.push(system_instruction::transfer(
                    &owner_pubkey,
                    &fee_payer,
                    additional_payback_fee,
                ));
            }
        }

        debug!(
            payback_fee,
            additional_payback_fee,
            instructions = instructions.len(),
            "payback instructions appended"
        );

        transaction
            .to_builder()
            .instructions(instructions)
            .signer(owner)
            .build()
    }
}
