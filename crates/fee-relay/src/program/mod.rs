pub mod account;

use crate::{
    network::Network,
    swap::SwapData,
    Result,
};
use account::{
    CreateTransitTokenAccounts, TopUpWithDirectSwapAccounts, TopUpWithTransitiveSwapAccounts,
    TransferSolAccounts,
};
use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
};

pub const MAINNET_PROGRAM_ID: Pubkey = pubkey!("12YKFL4mnZz6CBEGePrf293mEzueQM3h8VLPUJsKpGs9");
pub const DEVNET_PROGRAM_ID: Pubkey = pubkey!("6xKJFyuM6UHCT8F5SBxnjGt6ZrZYjsVfnAnAeHPU775k");

const RELAY_SEED: &[u8] = b"relay";
const TEMPORARY_WSOL_SEED: &[u8] = b"temporary_wsol";
const TRANSIT_SEED: &[u8] = b"transit";

pub fn id(network: Network) -> Pubkey {
    match network {
        Network::MainnetBeta => MAINNET_PROGRAM_ID,
        Network::Devnet | Network::Testnet => DEVNET_PROGRAM_ID,
    }
}

pub fn user_relay_address(user: &Pubkey, network: Network) -> Pubkey {
    Pubkey::find_program_address(&[user.as_ref(), RELAY_SEED], &id(network)).0
}

pub fn user_temporary_wsol_address(user: &Pubkey, network: Network) -> Pubkey {
    Pubkey::find_program_address(&[user.as_ref(), TEMPORARY_WSOL_SEED], &id(network)).0
}

pub fn transit_token_account_address(
    user: &Pubkey,
    transit_token_mint: &Pubkey,
    network: Network,
) -> Pubkey {
    Pubkey::find_program_address(
        &[user.as_ref(), transit_token_mint.as_ref(), TRANSIT_SEED],
        &id(network),
    )
    .0
}

/// Relay program instruction data: a one-byte variant index followed by
/// little-endian arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub enum RelayInstructionData {
    TopUpWithDirectSwap {
        amount_in: u64,
        minimum_amount_out: u64,
    },
    TopUpWithTransitiveSwap {
        amount_in: u64,
        transit_minimum_amount: u64,
        minimum_amount_out: u64,
    },
    TransferSol {
        lamports: u64,
    },
    CreateTransitToken,
}

pub fn try_build_instruction(
    program_id: &Pubkey,
    accounts: impl Into<Vec<AccountMeta>>,
    data: &impl BorshSerialize,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: accounts.into(),
        data: borsh::to_vec(data)?,
    })
}

/// Moves `lamports` from the user's relay account to `recipient`.
pub fn transfer_sol(
    user_authority: &Pubkey,
    recipient: &Pubkey,
    lamports: u64,
    network: Network,
) -> Result<Instruction> {
    try_build_instruction(
        &id(network),
        TransferSolAccounts::new(user_authority, recipient, network),
        &RelayInstructionData::TransferSol { lamports },
    )
}

pub fn create_transit_token(
    user_authority: &Pubkey,
    fee_payer: &Pubkey,
    transit_token_mint: &Pubkey,
    network: Network,
) -> Result<Instruction> {
    try_build_instruction(
        &id(network),
        CreateTransitTokenAccounts::new(user_authority, fee_payer, transit_token_mint, network),
        &RelayInstructionData::CreateTransitToken,
    )
}

/// Swaps from the user's source token account into the relay account, either
/// through a single pool or through a transit token.
pub fn top_up_swap(
    fee_payer: &Pubkey,
    user_authority: &Pubkey,
    user_source_token_account: &Pubkey,
    swap: &SwapData,
    network: Network,
) -> Result<Instruction> {
    match swap {
        SwapData::Spl(direct) => try_build_instruction(
            &id(network),
            TopUpWithDirectSwapAccounts::new(
                fee_payer,
                user_authority,
                user_source_token_account,
                direct,
                network,
            ),
            &RelayInstructionData::TopUpWithDirectSwap {
                amount_in: direct.amount_in,
                minimum_amount_out: direct.minimum_amount_out,
            },
        ),
        SwapData::SplTransitive(transitive) => try_build_instruction(
            &id(network),
            TopUpWithTransitiveSwapAccounts::new(
                fee_payer,
                user_authority,
                user_source_token_account,
                &transitive.transit_token_mint_pubkey,
                &transitive.from,
                &transitive.to,
                network,
            ),
            &RelayInstructionData::TopUpWithTransitiveSwap {
                amount_in: transitive.from.amount_in,
                transit_minimum_amount: transitive.from.minimum_amount_out,
                minimum_amount_out: transitive.to.minimum_amount_out,
            },
        ),
    }
}
