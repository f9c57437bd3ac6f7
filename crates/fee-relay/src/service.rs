use crate::{
    calculator::RelayFeeCalculator,
    client::{
        relay_api::{ClientInfo, OperationType, RelayTransactionParams, StatsInfo},
        AccountStorage, RelayApi, RelayRequest, SolanaRpc,
    },
    context::RelayContext,
    context_manager::RelayContextManager,
    fee::FeeAmount,
    preparer::TransactionPreparer,
    swap::SwapProvider,
    token::{PayingFeeToken, TokenAccount},
    top_up::TopUpOrchestrator,
    transaction::PreparedTransaction,
    Error, Result,
};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call relay options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeRelayerConfiguration {
    /// Flat surcharge paid back once per batch, on its last transaction.
    pub additional_payback_fee: u64,
    pub operation_type: OperationType,
    pub currency: Option<String>,
    /// Whether payback instructions are appended to relayed transactions.
    pub auto_payback: bool,
}

impl FeeRelayerConfiguration {
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            ..Default::default()
        }
    }
}

impl Default for FeeRelayerConfiguration {
    fn default() -> Self {
        Self {
            additional_payback_fee: 0,
            operation_type: OperationType::default(),
            currency: None,
            auto_payback: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RelayMode {
    Broadcast,
    SignOnly,
}

/// Relays user transactions through the fee relayer, topping the user's
/// relay account up first when the paying token requires it.
pub struct RelayService {
    context_manager: Arc<RelayContextManager>,
    rpc: Arc<dyn SolanaRpc>,
    relay_api: Arc<dyn RelayApi>,
    top_up: TopUpOrchestrator,
    preparer: TransactionPreparer,
    client_info: ClientInfo,
}

impl RelayService {
    pub fn new(
        context_manager: Arc<RelayContextManager>,
        rpc: Arc<dyn SolanaRpc>,
        swap_provider: Arc<dyn SwapProvider>,
        relay_api: Arc<dyn RelayApi>,
        account_storage: Arc<dyn AccountStorage>,
        client_info: ClientInfo,
    ) -> Self {
        let network = context_manager.network();
        Self {
            top_up: TopUpOrchestrator::new(
                rpc.clone(),
                swap_provider,
                relay_api.clone(),
                account_storage.clone(),
                network,
                client_info.clone(),
            ),
            preparer: TransactionPreparer::new(account_storage, network),
            context_manager,
            rpc,
            relay_api,
            client_info,
        }
    }

    pub fn with_calculator(mut self, calculator: Arc<dyn RelayFeeCalculator>) -> Self {
        self.top_up = self.top_up.with_calculator(calculator);
        self
    }

    pub fn with_new_transfer_authority(mut self, new_transfer_authority: bool) -> Self {
        self.top_up = self.top_up.with_new_transfer_authority(new_transfer_authority);
        self
    }

    pub fn context_manager(&self) -> &RelayContextManager {
        &self.context_manager
    }

    pub fn calculator(&self) -> &dyn RelayFeeCalculator {
        self.top_up.calculator()
    }

    /// Converts a lamport fee into units of `paying_token_mint` using the
    /// current swap quotes.
    pub async fn calculate_fee_in_paying_token(
        &self,
        fee_in_sol: FeeAmount,
        paying_token_mint: &Pubkey,
    ) -> Result<Option<FeeAmount>> {
        self.top_up
            .calculator()
            .calculate_fee_in_paying_token(self.top_up.swap_provider(), fee_in_sol, paying_token_mint)
            .await
    }

    /// Submits a single transaction without any top-up.
    pub async fn relay_transaction(
        &self,
        transaction: &PreparedTransaction,
        config: &FeeRelayerConfiguration,
    ) -> Result<Signature> {
        let params = transaction.relay_params(self.stats_info(config))?;
        self.relay_api
            .send_transaction(RelayRequest::RelayTransaction(params))
            .await
    }

    /// Requests the fee payer's signature for a single transaction without
    /// broadcasting it.
    pub async fn sign_relay_transaction(
        &self,
        transaction: &PreparedTransaction,
        config: &FeeRelayerConfiguration,
    ) -> Result<Signature> {
        let params = transaction.relay_params(self.stats_info(config))?;
        self.relay_api
            .send_transaction(RelayRequest::SignRelayTransaction(params))
            .await
    }

    pub async fn top_up_if_needed_and_relay_transactions(
        &self,
        transactions: &[PreparedTransaction],
        fee_token: Option<TokenAccount>,
        config: &FeeRelayerConfiguration,
    ) -> Result<Vec<Signature>> {
        self.relay_batch(transactions, fee_token.into(), config, RelayMode::Broadcast)
            .await
    }

    pub async fn top_up_if_needed_and_sign_relay_transactions(
        &self,
        transactions: &[PreparedTransaction],
        fee_token: Option<TokenAccount>,
        config: &FeeRelayerConfiguration,
    ) -> Result<Vec<Signature>> {
        self.relay_batch(transactions, fee_token.into(), config, RelayMode::SignOnly)
            .await
    }

    /// Tops up against a context the caller already holds. Fails with
    /// [`Error::InconsistentRelayContext`] when it is not the current one.
    pub async fn top_up(
        &self,
        amount: FeeAmount,
        paying_fee_token: Option<TokenAccount>,
        relay_context: &RelayContext,
    ) -> Result<Option<Vec<Signature>>> {
        if self.context_manager.current_context().as_ref() != Some(relay_context) {
            return Err(Error::InconsistentRelayContext);
        }

        let Some(signatures) = self
            .top_up
            .top_up_if_needed(relay_context, amount, &paying_fee_token.into())
            .await?
        else {
            return Ok(None);
        };

        let updated = relay_context.with_usage_recorded(relay_context.top_up_network_fee());
        if !self
            .context_manager
            .replace_context_if_current(relay_context, updated)
        {
            warn!("relay context changed while topping up, usage not recorded");
        }

        Ok(Some(signatures))
    }

    /// Obtains the fee payer's signature for each transaction and places it
    /// in the fee payer's signature slot.
    pub async fn sign_transaction(
        &self,
        mut transactions: Vec<VersionedTransaction>,
        config: &FeeRelayerConfiguration,
    ) -> Result<Vec<VersionedTransaction>> {
        let fee_payer = self
            .context_manager
            .current_context()
            .ok_or(Error::InvalidContext)?
            .fee_payer_address;

        for transaction in transactions.iter_mut() {
            let message = &transaction.message;
            let required_signatures = usize::from(message.header().num_required_signatures);
            let fee_payer_index = message
                .static_account_keys()
                .iter()
                .take(required_signatures)
                .position(|key| *key == fee_payer)
                .ok_or(Error::InvalidFeePayer)?;

            let params = RelayTransactionParams::from_versioned(
                transaction,
                &signed_keys(transaction),
                self.stats_info(config),
            )?;
            let signature = self
                .relay_api
                .send_transaction(RelayRequest::SignRelayTransaction(params))
                .await?;

            if transaction.signatures.len() < required_signatures {
                transaction
                    .signatures
                    .resize(required_signatures, Signature::default());
            }
            transaction.signatures[fee_payer_index] = signature;
            debug!(%signature, "fee payer signature added");
        }

        Ok(transactions)
    }

    async fn relay_batch(
        &self,
        transactions: &[PreparedTransaction],
        paying_fee_token: PayingFeeToken,
        config: &FeeRelayerConfiguration,
        mode: RelayMode,
    ) -> Result<Vec<Signature>> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let mut context = self.context_manager.update().await?;

        let expected_fee = transactions
            .iter()
            .map(PreparedTransaction::expected_fee)
            .sum();
        let topped_up = self
            .top_up
            .top_up_if_needed(&context, expected_fee, &paying_fee_token)
            .await?
            .is_some();

        if topped_up {
            context = context.with_usage_recorded(context.top_up_network_fee());
            self.context_manager.replace_context(context);
        }

        match self
            .relay_each(transactions, &mut context, &paying_fee_token, config, mode)
            .await
        {
            Err(err) if topped_up => {
                warn!(error = %err, "top-up succeeded but relaying failed");
                Err(Error::top_up_succeeded_but_transaction_failed(err))
            }
            result => result,
        }
    }

    async fn relay_each(
        &self,
        transactions: &[PreparedTransaction],
        context: &mut RelayContext,
        paying_fee_token: &PayingFeeToken,
        config: &FeeRelayerConfiguration,
        mode: RelayMode,
    ) -> Result<Vec<Signature>> {
        let last_index = transactions.len() - 1;
        let mut signatures = Vec::with_capacity(transactions.len());

        for (index, transaction) in transactions.iter().enumerate() {
            let additional_payback_fee = if index == last_index {
                config.additional_payback_fee
            } else {
                0
            };

            let prepared = self.preparer.prepare(
                context,
                transaction,
                paying_fee_token,
                &context.relay_account_status,
                additional_payback_fee,
                config.auto_payback,
            )?;
            let params = prepared.relay_params(self.stats_info(config))?;
            let request = match mode {
                RelayMode::Broadcast => RelayRequest::RelayTransaction(params),
                RelayMode::SignOnly => RelayRequest::SignRelayTransaction(params),
            };

            let signature = self.relay_api.send_transaction(request).await?;
            info!(%signature, index, ?mode, "transaction relayed");
            signatures.push(signature);

            *context = context.with_usage_recorded(transaction.expected_fee().transaction);
            self.context_manager.replace_context(*context);

            if mode == RelayMode::Broadcast && index < last_index {
                self.rpc.wait_for_confirmation(&signature, true).await?;
            }
        }

        Ok(signatures)
    }

    fn stats_info(&self, config: &FeeRelayerConfiguration) -> StatsInfo {
        self.client_info
            .stats_info(config.operation_type, config.currency.clone())
    }
}

/// Keys whose signature slot is already filled.
fn signed_keys(transaction: &VersionedTransaction) -> Vec<Pubkey> {
    transaction
        .message
        .static_account_keys()
        .iter()
        .zip(&transaction.signatures)
        .filter(|(_, signature)| **signature != Signature::default())
        .map(|(key, _)| *key)
        .collect()
}
