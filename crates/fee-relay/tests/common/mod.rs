#![allow(dead_code)]

use fee_relay::{
    client::{
        account::MockAccountStorage,
        relay_api::{
            ClientInfo, FeeLimitForAuthorityResponse, Limits, MockRelayApi, ProcessedFee,
            RelayRequest,
        },
        rpc::MockSolanaRpc,
    },
    context_manager::{RelayContextManager, TOKEN_ACCOUNT_LEN},
    fee::FeeAmount,
    network::Network,
    program,
    service::RelayService,
    swap::{MockSwapProvider, Pool},
    token::{TokenAccount, NATIVE_MINT},
    transaction::PreparedTransaction,
};
use mockall::predicate::eq;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use solana_system_interface::instruction::transfer;
use std::sync::{Arc, Mutex};

pub const MINIMUM_TOKEN_ACCOUNT_BALANCE: u64 = 2_039_280;
pub const MINIMUM_RELAY_ACCOUNT_BALANCE: u64 = 890_880;
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;
pub const MAX_USAGE: u64 = 100;
pub const MAX_AMOUNT: u64 = 1_000_000;

pub struct RelayTestSetup {
    pub owner: Arc<Keypair>,
    pub fee_payer: Pubkey,
    pub rpc: MockSolanaRpc,
    pub swap_provider: MockSwapProvider,
    pub relay_api: MockRelayApi,
    pub requests: Arc<Mutex<Vec<RelayRequest>>>,
}

/// Mocks answering a context refresh for a user whose relay account holds
/// `relay_account_balance` and who has used `fee_count` free transactions.
pub fn start_test(relay_account_balance: Option<u64>, fee_count: u64) -> RelayTestSetup {
    let owner = Arc::new(Keypair::new());
    let fee_payer = Pubkey::new_unique();
    let relay_account = program::user_relay_address(&owner.pubkey(), Network::MainnetBeta);

    let mut rpc = MockSolanaRpc::new();
    rpc.expect_get_minimum_balance_for_rent_exemption()
        .with(eq(TOKEN_ACCOUNT_LEN))
        .returning(|_| Ok(MINIMUM_TOKEN_ACCOUNT_BALANCE));
    rpc.expect_get_minimum_balance_for_rent_exemption()
        .with(eq(0))
        .returning(|_| Ok(MINIMUM_RELAY_ACCOUNT_BALANCE));
    rpc.expect_get_lamports_per_signature()
        .returning(|| Ok(LAMPORTS_PER_SIGNATURE));
    rpc.expect_get_balance_if_exists()
        .with(eq(relay_account))
        .returning(move |_| Ok(relay_account_balance));

    let mut relay_api = MockRelayApi::new();
    relay_api
        .expect_get_fee_payer_pubkey()
        .returning(move || Ok(fee_payer));
    relay_api
        .expect_get_free_fee_limits()
        .returning(move |_| Ok(fee_limits(fee_count)));

    RelayTestSetup {
        owner,
        fee_payer,
        rpc,
        swap_provider: MockSwapProvider::new(),
        relay_api,
        requests: Arc::new(Mutex::new(Vec::new())),
    }
}

pub fn fee_limits(fee_count: u64) -> FeeLimitForAuthorityResponse {
    FeeLimitForAuthorityResponse {
        authority: vec![],
        limits: Limits {
            use_free_fee: true,
            max_fee_amount: MAX_AMOUNT,
            max_fee_count: MAX_USAGE,
            ..Default::default()
        },
        processed_fee: ProcessedFee {
            total_fee_amount: 0,
            fee_count,
            rent_count: 0,
        },
    }
}

impl RelayTestSetup {
    /// Records every relay request matching `filter` and answers it with a
    /// fresh signature.
    pub fn expect_relay_requests(
        &mut self,
        times: usize,
        filter: fn(&RelayRequest) -> bool,
    ) -> &mut Self {
        let requests = self.requests.clone();
        self.relay_api
            .expect_send_transaction()
            .withf(move |request| filter(request))
            .times(times)
            .returning(move |request| {
                requests
                    .lock()
                    .expect("requests lock")
                    .push(request);
                Ok(Signature::new_unique())
            });
        self
    }

    pub fn expect_confirmations(&mut self, times: usize) -> &mut Self {
        self.rpc
            .expect_wait_for_confirmation()
            .withf(|_, ignore_intermediate_status| *ignore_intermediate_status)
            .times(times)
            .returning(|_, _| Ok(()));
        self
    }

    /// Offers a single USDC/SOL pool for top-up swaps.
    pub fn expect_direct_pool(&mut self, usdc_mint: Pubkey) -> &mut Self {
        let pools = vec![usdc_sol_pool(usdc_mint)];
        self.swap_provider
            .expect_get_tradable_pools_pairs()
            .with(eq(usdc_mint), eq(NATIVE_MINT))
            .returning(move |_, _| Ok(vec![pools.clone()]));
        self.rpc
            .expect_get_recent_blockhash()
            .returning(|| Ok(Hash::new_unique()));
        self
    }

    pub fn user_transaction(&self, expected_fee: FeeAmount) -> PreparedTransaction {
        PreparedTransaction::builder(self.fee_payer, Hash::new_unique())
            .instruction(transfer(
                &self.owner.pubkey(),
                &Pubkey::new_unique(),
                1_000_000,
            ))
            .signer(self.owner.clone())
            .expected_fee(expected_fee)
            .build()
            .expect("user transaction")
    }

    pub fn recorded_requests(&self) -> Vec<RelayRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn into_service(self) -> (RelayService, Arc<Mutex<Vec<RelayRequest>>>) {
        let owner = self.owner.clone();
        let mut account_storage = MockAccountStorage::new();
        account_storage
            .expect_account()
            .returning(move || Some(owner.clone()));

        let rpc = Arc::new(self.rpc);
        let relay_api = Arc::new(self.relay_api);
        let account_storage = Arc::new(account_storage);

        let context_manager = Arc::new(RelayContextManager::new(
            rpc.clone(),
            relay_api.clone(),
            account_storage.clone(),
            Network::MainnetBeta,
        ));
        let service = RelayService::new(
            context_manager,
            rpc,
            Arc::new(self.swap_provider),
            relay_api,
            account_storage,
            ClientInfo::default(),
        );

        (service, self.requests)
    }
}

pub fn usdc_account() -> TokenAccount {
    TokenAccount::new(Pubkey::new_unique(), Pubkey::new_unique())
}

/// USDC/SOL pool with 1M USDC against 10k SOL and a 0.3% fee.
pub fn usdc_sol_pool(usdc_mint: Pubkey) -> Pool {
    Pool {
        swap_program_id: Pubkey::new_unique(),
        account: Pubkey::new_unique(),
        authority: Pubkey::new_unique(),
        pool_token_mint: Pubkey::new_unique(),
        fee_account: Pubkey::new_unique(),
        token_account_a: Pubkey::new_unique(),
        token_account_b: Pubkey::new_unique(),
        token_a_mint: usdc_mint,
        token_b_mint: NATIVE_MINT,
        token_a_balance: 1_000_000_000_000,
        token_b_balance: 10_000_000_000_000,
        fee_numerator: 30,
        fee_denominator: 10_000,
        owner_trade_fee_numerator: 0,
        owner_trade_fee_denominator: 0,
    }
}

pub fn is_top_up(request: &RelayRequest) -> bool {
    matches!(request, RelayRequest::RelayTopUpWithSwap(_))
}

pub fn is_relay(request: &RelayRequest) -> bool {
    matches!(request, RelayRequest::RelayTransaction(_))
}

pub fn is_sign(request: &RelayRequest) -> bool {
    matches!(request, RelayRequest::SignRelayTransaction(_))
}
