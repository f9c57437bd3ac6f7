use crate::{
    calculator::{DefaultRelayFeeCalculator, RelayFeeCalculator},
    client::{
        account::require_account,
        relay_api::{
            ClientInfo, OperationType, RelayApi, RelayRequest, SwapTransactionSignatures,
            TopUpWithSwapParams,
        },
        AccountStorage, SolanaRpc,
    },
    context::{RelayAccountStatus, RelayContext},
    fee::FeeAmount,
    network::Network,
    program,
    swap::{PoolsPair, SwapData, SwapProvider, TransitiveSwapData, TOP_UP_SLIPPAGE},
    token::{associated_token_address, PayingFeeToken, TokenAccount, NATIVE_MINT},
    transaction::PreparedTransaction,
    Error, Result,
};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use solana_system_interface::instruction as system_instruction;
use std::sync::Arc;
use tracing::{debug, info};

/// A signed top-up transaction together with the swap it performs.
#[derive(Clone, Debug)]
pub struct TopUpTransaction {
    pub swap: SwapData,
    pub transfer_authority: Option<Arc<Keypair>>,
    pub prepared: PreparedTransaction,
}

/// Funds the user's relay account by swapping the paying token into SOL
/// through the relay program.
pub struct TopUpOrchestrator {
    rpc: Arc<dyn SolanaRpc>,
    swap_provider: Arc<dyn SwapProvider>,
    relay_api: Arc<dyn RelayApi>,
    account_storage: Arc<dyn AccountStorage>,
    calculator: Arc<dyn RelayFeeCalculator>,
    network: Network,
    client_info: ClientInfo,
    new_transfer_authority: bool,
}

impl TopUpOrchestrator {
    pub fn new(
        rpc: Arc<dyn SolanaRpc>,
        swap_provider: Arc<dyn SwapProvider>,
        relay_api: Arc<dyn RelayApi>,
        account_storage: Arc<dyn AccountStorage>,
        network: Network,
        client_info: ClientInfo,
    ) -> Self {
        Self {
            rpc,
            swap_provider,
            relay_api,
            account_storage,
            calculator: Arc::new(DefaultRelayFeeCalculator),
            network,
            client_info,
            new_transfer_authority: false,
        }
    }

    pub fn with_calculator(mut self, calculator: Arc<dyn RelayFeeCalculator>) -> Self {
        self.calculator = calculator;
        self
    }

    /// Delegates the swap to a fresh transfer authority keypair instead of the
    /// owner, approving it on the source token account first.
    pub fn with_new_transfer_authority(mut self, new_transfer_authority: bool) -> Self {
        self.new_transfer_authority = new_transfer_authority;
        self
    }

    pub fn calculator(&self) -> &dyn RelayFeeCalculator {
        self.calculator.as_ref()
    }

    pub fn swap_provider(&self) -> &dyn SwapProvider {
        self.swap_provider.as_ref()
    }

    /// Tops the relay account up so it can front `expected_fee`. Returns
    /// `None` when the fee is paid natively or no top-up is required.
    pub async fn top_up_if_needed(
        &self,
        context: &RelayContext,
        expected_fee: FeeAmount,
        paying_fee_token: &PayingFeeToken,
    ) -> Result<Option<Vec<Signature>>> {
        let source = match paying_fee_token {
            PayingFeeToken::Native => {
                debug!("paying natively, top-up skipped");
                return Ok(None);
            }
            PayingFeeToken::Spl(source) => source,
        };

        let amount =
            self.calculator
                .calculate_needed_top_up_amount(context, expected_fee, Some(&source.mint));
        if amount.is_zero() {
            debug!(mint = %source.mint, "relay account sufficiently funded");
            return Ok(None);
        }

        info!(
            mint = %source.mint,
            top_up = amount.total(),
            "relay account top-up needed"
        );
        let pools = self
            .pools_pair_for_top_up(amount.total(), &source.mint)
            .await?;

        self.top_up(context, source, amount.total(), &pools)
            .await
            .map(Some)
    }

    /// Route from `mint` to SOL, preferring a single-hop pool.
    pub async fn pools_pair_for_top_up(
        &self,
        top_up_amount: u64,
        mint: &Pubkey,
    ) -> Result<PoolsPair> {
        let pools_pairs = self
            .swap_provider
            .get_tradable_pools_pairs(mint, &NATIVE_MINT)
            .await?;

        if let Some(direct) = pools_pairs.iter().find(|pools| pools.len() == 1) {
            return Ok(direct.clone());
        }

        self.swap_provider
            .find_best_pools_pair_for_estimated_amount(top_up_amount, &pools_pairs)
            .ok_or(Error::SwapPoolsNotFound)
    }

    async fn top_up(
        &self,
        context: &RelayContext,
        source: &TokenAccount,
        target_amount: u64,
        pools: &PoolsPair,
    ) -> Result<Vec<Signature>> {
        let owner = require_account(self.account_storage.as_ref())?.pubkey();
        let blockhash = self.rpc.get_recent_blockhash().await?;

        let TopUpTransaction {
            swap,
            transfer_authority,
            prepared,
        } = self
            .build_top_up_transaction(context, source, pools, target_amount, blockhash)
            .await?;

        if prepared.transaction().signatures.len() < 2 {
            return Err(Error::InvalidSignature);
        }
        let signatures = SwapTransactionSignatures {
            user_authority_signature: prepared
                .signature_of(&owner)
                .ok_or(Error::InvalidSignature)?,
            transfer_authority_signature: transfer_authority
                .and_then(|authority| prepared.signature_of(&authority.pubkey())),
        };

        let request = RelayRequest::RelayTopUpWithSwap(TopUpWithSwapParams {
            user_source_token_account_pubkey: source.address,
            source_token_mint_pubkey: source.mint,
            user_authority_pubkey: owner,
            top_up_swap: swap,
            fee_amount: prepared.expected_fee().total(),
            signatures,
            blockhash,
            info: self
                .client_info
                .stats_info(OperationType::TopUp, Some(source.mint.to_string())),
        });

        let signature = self.relay_api.send_transaction(request).await?;
        info!(%signature, fee_amount = prepared.expected_fee().total(), "top-up submitted");

        Ok(vec![signature])
    }

    /// Assembles and signs the top-up transaction swapping enough of
    /// `source` to receive `target_amount` lamports.
    pub async fn build_top_up_transaction(
        &self,
        context: &RelayContext,
        source: &TokenAccount,
        pools: &PoolsPair,
        target_amount: u64,
        blockhash: Hash,
    ) -> Result<TopUpTransaction> {
        let account = require_account(self.account_storage.as_ref())?;
        let owner = account.pubkey();
        let fee_payer = context.fee_payer_address;

        if source.address == associated_token_address(&fee_payer, &source.mint) {
            return Err(Error::Unknown);
        }

        let mut expected_fee = FeeAmount::ZERO;
        let top_up_network_fee = context.top_up_network_fee();
        if !context
            .usage_status
            .is_free_transaction_fee_available(top_up_network_fee)
        {
            expected_fee.transaction += top_up_network_fee;
        }

        let mut instructions = Vec::new();

        if context.relay_account_status == RelayAccountStatus::NotYetCreated {
            instructions.push(system_instruction::transfer(
                &fee_payer,
                &program::user_relay_address(&owner, self.network),
                context.minimum_relay_account_balance,
            ));
            expected_fee.account_balances += context.minimum_relay_account_balance;
        }

        let transit_token = self.transit_token(&owner, pools);
        let needs_create_transit_token_account = match &transit_token {
            Some(transit) => self
                .rpc
                .get_balance_if_exists(&transit.address)
                .await?
                .is_none(),
            None => false,
        };

        let (swap, transfer_authority) = self.prepare_swap_data(
            &owner,
            pools,
            target_amount,
            transit_token.map(|transit| transit.mint),
            needs_create_transit_token_account,
        )?;

        let amount_in = match &swap {
            SwapData::Spl(direct) => direct.amount_in,
            SwapData::SplTransitive(transitive) => transitive.from.amount_in,
        };
        if let Some(authority) = &transfer_authority {
            instructions.push(spl_token::instruction::approve(
                &spl_token::ID,
                &source.address,
                &authority.pubkey(),
                &owner,
                &[],
                amount_in,
            )?);
        }

        if let SwapData::SplTransitive(transitive) = &swap {
            if transitive.needs_create_transit_token_account {
                instructions.push(program::create_transit_token(
                    &owner,
                    &fee_payer,
                    &transitive.transit_token_mint_pubkey,
                    self.network,
                )?);
            }
        }

        // Temporary WSOL account receiving the swap output.
        expected_fee.account_balances += context.minimum_token_account_balance;

        instructions.push(program::top_up_swap(
            &fee_payer,
            &owner,
            &source.address,
            &swap,
            self.network,
        )?);
        instructions.push(program::transfer_sol(
            &owner,
            &fee_payer,
            expected_fee.total(),
            self.network,
        )?);

        let mut builder = PreparedTransaction::builder(fee_payer, blockhash)
            .instructions(instructions)
            .signer(account)
            .expected_fee(expected_fee);
        if let Some(authority) = &transfer_authority {
            builder = builder.signer(authority.clone());
        }
        let prepared = builder.build()?;

        debug!(
            instructions = prepared.instructions().len(),
            transaction_fee = expected_fee.transaction,
            account_balances = expected_fee.account_balances,
            "top-up transaction built"
        );

        Ok(TopUpTransaction {
            swap,
            transfer_authority,
            prepared,
        })
    }

    fn transit_token(&self, owner: &Pubkey, pools: &PoolsPair) -> Option<TokenAccount> {
        match pools.as_slice() {
            [first, _] => Some(TokenAccount::new(
                program::transit_token_account_address(owner, &first.token_b_mint, self.network),
                first.token_b_mint,
            )),
            _ => None,
        }
    }

    fn prepare_swap_data(
        &self,
        owner: &Pubkey,
        pools: &PoolsPair,
        minimum_amount_out: u64,
        transit_token_mint: Option<Pubkey>,
        needs_create_transit_token_account: bool,
    ) -> Result<(SwapData, Option<Arc<Keypair>>)> {
        let transfer_authority = self
            .new_transfer_authority
            .then(|| Arc::new(Keypair::new()));
        let authority = transfer_authority
            .as_ref()
            .map_or(*owner, |authority| authority.pubkey());

        let swap = match pools.as_slice() {
            [pool] => {
                let amount_in = pool
                    .input_amount(minimum_amount_out, TOP_UP_SLIPPAGE)
                    .ok_or(Error::InvalidAmount)?;
                SwapData::Spl(pool.swap_data(authority, amount_in, minimum_amount_out))
            }
            [first, second] => {
                let transit_token_mint_pubkey =
                    transit_token_mint.ok_or(Error::TransitTokenMintNotFound)?;
                let transit_amount = second
                    .input_amount(minimum_amount_out, TOP_UP_SLIPPAGE)
                    .unwrap_or_default();
                let amount_in = first
                    .input_amount(transit_amount, TOP_UP_SLIPPAGE)
                    .ok_or(Error::InvalidAmount)?;

                SwapData::SplTransitive(TransitiveSwapData {
                    from: first.swap_data(authority, amount_in, transit_amount),
                    to: second.swap_data(authority, transit_amount, minimum_amount_out),
                    transit_token_mint_pubkey,
                    needs_create_transit_token_account,
                })
            }
            _ => return Err(Error::SwapPoolsNotFound),
        };

        Ok((swap, transfer_authority))
    }
}
