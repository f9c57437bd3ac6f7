use crate::{network::Network, swap::DirectSwapData, token::NATIVE_MINT};
use solana_sdk::{instruction::AccountMeta, pubkey::Pubkey, sysvar};
use solana_system_interface::program as system_program;

use super::{transit_token_account_address, user_relay_address, user_temporary_wsol_address};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSolAccounts {
    pub user_authority_key: Pubkey,
    pub user_relay_key: Pubkey,
    pub recipient_key: Pubkey,
}

impl TransferSolAccounts {
    pub fn new(user_authority_key: &Pubkey, recipient_key: &Pubkey, network: Network) -> Self {
        Self {
            user_authority_key: *user_authority_key,
            user_relay_key: user_relay_address(user_authority_key, network),
            recipient_key: *recipient_key,
        }
    }
}

impl From<TransferSolAccounts> for Vec<AccountMeta> {
    fn from(accounts: TransferSolAccounts) -> Self {
        let TransferSolAccounts {
            user_authority_key,
            user_relay_key,
            recipient_key,
        } = accounts;

        vec![
            AccountMeta::new_readonly(user_authority_key, true),
            AccountMeta::new(user_relay_key, false),
            AccountMeta::new(recipient_key, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransitTokenAccounts {
    pub transit_token_account_key: Pubkey,
    pub transit_token_mint_key: Pubkey,
    pub user_authority_key: Pubkey,
    pub fee_payer_key: Pubkey,
}

impl CreateTransitTokenAccounts {
    pub fn new(
        user_authority_key: &Pubkey,
        fee_payer_key: &Pubkey,
        transit_token_mint_key: &Pubkey,
        network: Network,
    ) -> Self {
        Self {
            transit_token_account_key: transit_token_account_address(
                user_authority_key,
                transit_token_mint_key,
                network,
            ),
            transit_token_mint_key: *transit_token_mint_key,
            user_authority_key: *user_authority_key,
            fee_payer_key: *fee_payer_key,
        }
    }
}

impl From<CreateTransitTokenAccounts> for Vec<AccountMeta> {
    fn from(accounts: CreateTransitTokenAccounts) -> Self {
        let CreateTransitTokenAccounts {
            transit_token_account_key,
            transit_token_mint_key,
            user_authority_key,
            fee_payer_key,
        } = accounts;

        vec![
            AccountMeta::new(transit_token_account_key, false),
            AccountMeta::new_readonly(transit_token_mint_key, false),
            AccountMeta::new(user_authority_key, true),
            AccountMeta::new_readonly(fee_payer_key, true),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpWithDirectSwapAccounts {
    pub fee_payer_key: Pubkey,
    pub user_authority_key: Pubkey,
    pub user_relay_key: Pubkey,
    pub user_source_token_account_key: Pubkey,
    pub user_temporary_wsol_key: Pubkey,
    pub swap: DirectSwapData,
}

impl TopUpWithDirectSwapAccounts {
    pub fn new(
        fee_payer_key: &Pubkey,
        user_authority_key: &Pubkey,
        user_source_token_account_key: &Pubkey,
        swap: &DirectSwapData,
        network: Network,
    ) -> Self {
        Self {
            fee_payer_key: *fee_payer_key,
            user_authority_key: *user_authority_key,
            user_relay_key: user_relay_address(user_authority_key, network),
            user_source_token_account_key: *user_source_token_account_key,
            user_temporary_wsol_key: user_temporary_wsol_address(user_authority_key, network),
            swap: swap.clone(),
        }
    }
}

impl From<TopUpWithDirectSwapAccounts> for Vec<AccountMeta> {
    fn from(accounts: TopUpWithDirectSwapAccounts) -> Self {
        let TopUpWithDirectSwapAccounts {
            fee_payer_key,
            user_authority_key,
            user_relay_key,
            user_source_token_account_key,
            user_temporary_wsol_key,
            swap,
        } = accounts;

        vec![
            AccountMeta::new_readonly(NATIVE_MINT, false),
            AccountMeta::new(fee_payer_key, true),
            AccountMeta::new_readonly(user_authority_key, true),
            AccountMeta::new(user_relay_key, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(swap.program_id, false),
            AccountMeta::new_readonly(swap.account_pubkey, false),
            AccountMeta::new_readonly(swap.authority_pubkey, false),
            AccountMeta::new_readonly(swap.transfer_authority_pubkey, true),
            AccountMeta::new(user_source_token_account_key, false),
            AccountMeta::new(user_temporary_wsol_key, false),
            AccountMeta::new(swap.source_pubkey, false),
            AccountMeta::new(swap.destination_pubkey, false),
            AccountMeta::new(swap.pool_token_mint_pubkey, false),
            AccountMeta::new(swap.pool_fee_account_pubkey, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpWithTransitiveSwapAccounts {
    pub fee_payer_key: Pubkey,
    pub user_authority_key: Pubkey,
    pub user_relay_key: Pubkey,
    pub user_source_token_account_key: Pubkey,
    pub user_transit_token_account_key: Pubkey,
    pub user_destination_token_account_key: Pubkey,
    pub from: DirectSwapData,
    pub to: DirectSwapData,
}

impl TopUpWithTransitiveSwapAccounts {
    pub fn new(
        fee_payer_key: &Pubkey,
        user_authority_key: &Pubkey,
        user_source_token_account_key: &Pubkey,
        transit_token_mint_key: &Pubkey,
        from: &DirectSwapData,
        to: &DirectSwapData,
        network: Network,
    ) -> Self {
        Self {
            fee_payer_key: *fee_payer_key,
            user_authority_key: *user_authority_key,
            user_relay_key: user_relay_address(user_authority_key, network),
            user_source_token_account_key: *user_source_token_account_key,
            user_transit_token_account_key: transit_token_account_address(
                user_authority_key,
                transit_token_mint_key,
                network,
            ),
            user_destination_token_account_key: user_temporary_wsol_address(
                user_authority_key,
                network,
            ),
            from: from.clone(),
            to: to.clone(),
        }
    }
}

fn swap_pool_metas(swap: DirectSwapData) -> [AccountMeta; 7] {
    [
        AccountMeta::new_readonly(swap.program_id, false),
        AccountMeta::new_readonly(swap.account_pubkey, false),
        AccountMeta::new_readonly(swap.authority_pubkey, false),
        AccountMeta::new(swap.source_pubkey, false),
        AccountMeta::new(swap.destination_pubkey, false),
        AccountMeta::new(swap.pool_token_mint_pubkey, false),
        AccountMeta::new(swap.pool_fee_account_pubkey, false),
    ]
}

impl From<TopUpWithTransitiveSwapAccounts> for Vec<AccountMeta> {
    fn from(accounts: TopUpWithTransitiveSwapAccounts) -> Self {
        let TopUpWithTransitiveSwapAccounts {
            fee_payer_key,
            user_authority_key,
            user_relay_key,
            user_source_token_account_key,
            user_transit_token_account_key,
            user_destination_token_account_key,
            from,
            to,
        } = accounts;

        let mut metas = vec![
            AccountMeta::new_readonly(NATIVE_MINT, false),
            AccountMeta::new(fee_payer_key, true),
            AccountMeta::new_readonly(user_authority_key, true),
            AccountMeta::new(user_relay_key, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(from.transfer_authority_pubkey, true),
            AccountMeta::new(user_source_token_account_key, false),
            AccountMeta::new(user_transit_token_account_key, false),
            AccountMeta::new(user_destination_token_account_key, false),
        ];
        metas.extend(swap_pool_metas(from));
        metas.extend(swap_pool_metas(to));
        metas.extend([
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ]);
        metas
    }
}
