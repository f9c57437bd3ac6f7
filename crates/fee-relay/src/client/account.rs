use crate::{Error, Result};
use mockall::automock;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use std::{fs, path::Path, sync::Arc};

/// Source of the user's signing keypair.
#[automock]
pub trait AccountStorage: Send + Sync {
    fn account(&self) -> Option<Arc<Keypair>>;
}

/// Resolves the signing account, failing with [`Error::Unauthorized`] when
/// the storage holds none.
pub fn require_account(storage: &dyn AccountStorage) -> Result<Arc<Keypair>> {
    storage.account().ok_or(Error::Unauthorized)
}

pub fn require_owner(storage: &dyn AccountStorage) -> Result<Pubkey> {
    Ok(require_account(storage)?.pubkey())
}

/// Account storage backed by a single keypair, usually read from a JSON
/// byte-array keypair file.
pub struct KeypairAccountStorage(Arc<Keypair>);

impl KeypairAccountStorage {
    pub fn new(keypair: Arc<Keypair>) -> Self {
        Self(keypair)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_content = fs::read_to_string(path)?;
        let secret_key_bytes: Vec<u8> = serde_json::from_str(&file_content)?;
        let keypair = Keypair::try_from(secret_key_bytes.as_slice())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string()))?;

        Ok(Self::new(Arc::new(keypair)))
    }
}

impl AccountStorage for KeypairAccountStorage {
    fn account(&self) -> Option<Arc<Keypair>> {
        Some(self.0.clone())
    }
}
