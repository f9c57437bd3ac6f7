use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account_client::address::get_associated_token_address;

/// Wrapped SOL mint. Paying with it is the same as paying natively.
pub const NATIVE_MINT: Pubkey = spl_token::native_mint::ID;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenAccount {
    pub address: Pubkey,
    pub mint: Pubkey,
}

impl TokenAccount {
    pub fn new(address: Pubkey, mint: Pubkey) -> Self {
        Self { address, mint }
    }

    pub fn is_native(&self) -> bool {
        self.mint == NATIVE_MINT
    }
}

/// Token the user pays relay fees with. Absence of a token and wrapped SOL
/// both collapse to [`PayingFeeToken::Native`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayingFeeToken {
    Native,
    Spl(TokenAccount),
}

impl PayingFeeToken {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl From<Option<TokenAccount>> for PayingFeeToken {
    fn from(token: Option<TokenAccount>) -> Self {
        match token {
            Some(account) if !account.is_native() => Self::Spl(account),
            _ => Self::Native,
        }
    }
}

impl From<TokenAccount> for PayingFeeToken {
    fn from(token: TokenAccount) -> Self {
        Some(token).into()
    }
}

pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}
