use clap::Parser;
use fee_relay::{
    client::{account::require_owner, HttpRelayApiClient, SolanaRpcClient},
    context_manager::RelayContextManager,
    settings::{AppArgs, Settings},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = AppArgs::parse();
    let settings = Settings::new(args.config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&settings.log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let sol_rpc = settings.sol_rpc()?;
    let relay_api = settings.relay_api()?;
    let network = settings.network();
    let account_storage = settings.account_storage()?;
    let owner = require_owner(&account_storage)?;

    info!(
        %sol_rpc,
        %relay_api,
        %network,
        %owner,
        "fee relay context loading"
    );

    let context_manager = RelayContextManager::new(
        Arc::new(SolanaRpcClient::new(sol_rpc)),
        Arc::new(HttpRelayApiClient::new(
            relay_api,
            settings.relay_api_version(),
        )),
        Arc::new(account_storage),
        network,
    );

    let context = context_manager.update().await?;

    info!(
        fee_payer = %context.fee_payer_address,
        lamports_per_signature = context.lamports_per_signature,
        minimum_token_account_balance = context.minimum_token_account_balance,
        minimum_relay_account_balance = context.minimum_relay_account_balance,
        relay_account = ?context.relay_account_status,
        usage = ?context.usage_status,
        "fee relay context"
    );

    Ok(())
}
