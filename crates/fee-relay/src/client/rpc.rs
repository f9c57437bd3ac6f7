use crate::{Error, Result};
use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use mockall::automock;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{
    hash::Hash, message::Message, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(500);
const CONFIRMATION_MAX_POLLS: usize = 120;

/// Solana node access used by the relay workflow.
#[automock]
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    async fn get_recent_blockhash(&self) -> Result<Hash>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    async fn get_lamports_per_signature(&self) -> Result<u64>;

    /// Lamport balance of `address`, or `None` when the account does not exist.
    async fn get_balance_if_exists(&self, address: &Pubkey) -> Result<Option<u64>>;

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature>;

    /// Blocks until `signature` reaches the confirmed commitment level.
    /// Intermediate statuses are traced unless `ignore_intermediate_status`.
    async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        ignore_intermediate_status: bool,
    ) -> Result<()>;
}

pub struct SolanaRpcClient(RpcClient);

impl SolanaRpcClient {
    pub fn new(rpc_url: Url) -> Self {
        Self(RpcClient::new_with_commitment(
            rpc_url.into(),
            CommitmentConfig::confirmed(),
        ))
    }
}

#[async_trait]
impl SolanaRpc for SolanaRpcClient {
    async fn get_recent_blockhash(&self) -> Result<Hash> {
        Ok(self.0.get_latest_blockhash().await?)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(self
            .0
            .get_minimum_balance_for_rent_exemption(data_len)
            .await?)
    }

    async fn get_lamports_per_signature(&self) -> Result<u64> {
        let blockhash = self.0.get_latest_blockhash().await?;
        let message = Message::new_with_blockhash(&[], Some(&Pubkey::default()), &blockhash);

        Ok(self.0.get_fee_for_message(&message).await?)
    }

    async fn get_balance_if_exists(&self, address: &Pubkey) -> Result<Option<u64>> {
        let account = self
            .0
            .get_account_with_commitment(address, self.0.commitment())
            .await?
            .value;

        Ok(account.map(|account| account.lamports))
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        Ok(self.0.send_transaction(transaction).await?)
    }

    async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        ignore_intermediate_status: bool,
    ) -> Result<()> {
        let signature = *signature;
        let client = &self.0;

        (|| async move {
            let status = client
                .get_signature_statuses(&[signature])
                .await?
                .value
                .into_iter()
                .next()
                .flatten()
                .ok_or(Error::SignatureNotConfirmed(signature))?;

            if let Some(err) = status.err {
                return Err(Error::TransactionFailed {
                    signature,
                    reason: err.to_string(),
                });
            }
            if !status.satisfies_commitment(CommitmentConfig::confirmed()) {
                if !ignore_intermediate_status {
                    debug!(%signature, status = ?status.confirmation_status, "transaction pending");
                }
                return Err(Error::SignatureNotConfirmed(signature));
            }

            Ok(())
        })
        .retry(
            ConstantBuilder::default()
                .with_delay(CONFIRMATION_POLL_INTERVAL)
                .with_max_times(CONFIRMATION_MAX_POLLS),
        )
        .when(|err: &Error| matches!(err, Error::SignatureNotConfirmed(_)))
        .await?;

        info!(%signature, "transaction confirmed");
        Ok(())
    }
}
