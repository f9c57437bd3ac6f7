use crate::{
    client::{account::require_owner, AccountStorage, RelayApi, SolanaRpc},
    context::{RelayAccountStatus, RelayContext, UsageStatus},
    network::Network,
    program, Result,
};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, info};

/// Size of an SPL token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// Owns the current [`RelayContext`]. Reads are lock-free snapshot copies and
/// writes replace the whole value, so readers never observe a partial update.
pub struct RelayContextManager {
    context: ArcSwapOption<RelayContext>,
    rpc: Arc<dyn SolanaRpc>,
    relay_api: Arc<dyn RelayApi>,
    account_storage: Arc<dyn AccountStorage>,
    network: Network,
}

impl RelayContextManager {
    pub fn new(
        rpc: Arc<dyn SolanaRpc>,
        relay_api: Arc<dyn RelayApi>,
        account_storage: Arc<dyn AccountStorage>,
        network: Network,
    ) -> Self {
        Self {
            context: ArcSwapOption::empty(),
            rpc,
            relay_api,
            account_storage,
            network,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn current_context(&self) -> Option<RelayContext> {
        self.context.load().as_deref().copied()
    }

    /// Fetches the relay account state and relay backend parameters
    /// concurrently and installs the resulting snapshot.
    pub async fn update(&self) -> Result<RelayContext> {
        let owner = require_owner(self.account_storage.as_ref())?;
        let relay_account = program::user_relay_address(&owner, self.network);

        let (
            minimum_token_account_balance,
            minimum_relay_account_balance,
            lamports_per_signature,
            relay_account_balance,
            fee_payer_address,
            fee_limits,
        ) = futures::try_join!(
            self.rpc
                .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN),
            self.rpc.get_minimum_balance_for_rent_exemption(0),
            self.rpc.get_lamports_per_signature(),
            self.rpc.get_balance_if_exists(&relay_account),
            self.relay_api.get_fee_payer_pubkey(),
            self.relay_api.get_free_fee_limits(&owner),
        )?;

        let context = RelayContext {
            minimum_token_account_balance,
            minimum_relay_account_balance,
            fee_payer_address,
            lamports_per_signature,
            relay_account_status: RelayAccountStatus::from(relay_account_balance),
            usage_status: UsageStatus::from(&fee_limits),
        };

        info!(
            %owner,
            fee_payer = %context.fee_payer_address,
            relay_account = ?context.relay_account_status,
            current_usage = context.usage_status.current_usage,
            max_usage = context.usage_status.max_usage,
            "relay context refreshed"
        );
        self.replace_context(context);

        Ok(context)
    }

    pub fn replace_context(&self, context: RelayContext) {
        debug!(usage = ?context.usage_status, "relay context replaced");
        self.context.store(Some(Arc::new(context)));
    }

    /// Installs `new` only if the held snapshot still equals `expected`.
    /// Returns whether the replacement happened.
    pub fn replace_context_if_current(&self, expected: &RelayContext, new: RelayContext) -> bool {
        let current = self.context.load_full();
        if current.as_deref() != Some(expected) {
            return false;
        }

        let previous = self.context.compare_and_swap(&current, Some(Arc::new(new)));
        match (&*previous, &current) {
            (Some(previous), Some(current)) => Arc::ptr_eq(previous, current),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        account::MockAccountStorage,
        relay_api::{FeeLimitForAuthorityResponse, Limits, MockRelayApi, ProcessedFee},
        rpc::MockSolanaRpc,
    };
    use mockall::predicate::eq;
    use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};

    fn fee_limits(use_free_fee: bool) -> FeeLimitForAuthorityResponse {
        FeeLimitForAuthorityResponse {
            authority: vec![],
            limits: Limits {
                use_free_fee,
                max_fee_amount: 10_000_000,
                max_fee_count: 100,
                ..Default::default()
            },
            processed_fee: ProcessedFee {
                total_fee_amount: 15_000,
                fee_count: 3,
                rent_count: 0,
            },
        }
    }

    fn manager(relay_balance: Option<u64>, use_free_fee: bool, fee_payer: Pubkey) -> RelayContextManager {
        let owner = Arc::new(Keypair::new());
        let relay_account = program::user_relay_address(&owner.pubkey(), Network::MainnetBeta);

        let mut rpc = MockSolanaRpc::new();
        rpc.expect_get_minimum_balance_for_rent_exemption()
            .with(eq(TOKEN_ACCOUNT_LEN))
            .returning(|_| Ok(2_039_280));
        rpc.expect_get_minimum_balance_for_rent_exemption()
            .with(eq(0))
            .returning(|_| Ok(890_880));
        rpc.expect_get_lamports_per_signature()
            .returning(|| Ok(5_000));
        rpc.expect_get_balance_if_exists()
            .withf(move |address| *address == relay_account)
            .times(1)
            .returning(move |_| Ok(relay_balance));

        let mut relay_api = MockRelayApi::new();
        relay_api
            .expect_get_fee_payer_pubkey()
            .returning(move || Ok(fee_payer));
        let authority = owner.pubkey();
        relay_api
            .expect_get_free_fee_limits()
            .withf(move |pubkey| *pubkey == authority)
            .returning(move |_| Ok(fee_limits(use_free_fee)));

        let mut account_storage = MockAccountStorage::new();
        account_storage
            .expect_account()
            .returning(move || Some(owner.clone()));

        RelayContextManager::new(
            Arc::new(rpc),
            Arc::new(relay_api),
            Arc::new(account_storage),
            Network::MainnetBeta,
        )
    }

    #[tokio::test]
    async fn test_update_installs_fresh_context() {
        let fee_payer = Pubkey::new_unique();
        let manager = manager(Some(1_000_000), true, fee_payer);
        assert!(manager.current_context().is_none());

        let context = manager.update().await.unwrap();

        assert_eq!(manager.current_context(), Some(context));
        assert_eq!(context.minimum_token_account_balance, 2_039_280);
        assert_eq!(context.minimum_relay_account_balance, 890_880);
        assert_eq!(context.lamports_per_signature, 5_000);
        assert_eq!(context.fee_payer_address, fee_payer);
        assert_eq!(
            context.relay_account_status,
            RelayAccountStatus::Created { balance: 1_000_000 }
        );
        assert_eq!(
            context.usage_status,
            UsageStatus {
                max_usage: 100,
                current_usage: 3,
                max_amount: 10_000_000,
                amount_used: 15_000,
            }
        );
    }

    #[tokio::test]
    async fn test_update_without_free_fee_has_no_quota() {
        let manager = manager(None, false, Pubkey::new_unique());

        let context = manager.update().await.unwrap();

        assert_eq!(context.relay_account_status, RelayAccountStatus::NotYetCreated);
        assert_eq!(context.usage_status.max_usage, 0);
        assert!(!context.usage_status.is_free_transaction_fee_available(0));
    }

    #[tokio::test]
    async fn test_replace_context_if_current() {
        let manager = manager(Some(0), true, Pubkey::new_unique());
        let context = manager.update().await.unwrap();

        let stale = context.with_usage_recorded(5_000);
        assert!(!manager.replace_context_if_current(&stale, stale.with_usage_recorded(5_000)));
        assert_eq!(manager.current_context(), Some(context));

        assert!(manager.replace_context_if_current(&context, stale));
        assert_eq!(manager.current_context(), Some(stale));
    }
}
