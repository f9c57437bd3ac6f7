use crate::{
    client::relay_api::{RelayTransactionParams, StatsInfo},
    fee::FeeAmount,
    Result,
};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::{Transaction, VersionedTransaction},
};
use std::sync::Arc;

/// A user transaction ready to be relayed: the partially signed transaction,
/// the local keypairs that signed it and the fee it is expected to cost.
///
/// Instances are immutable. Appending instructions goes through
/// [`PreparedTransaction::to_builder`], which re-signs on
/// [`TransactionBuilder::build`].
#[derive(Clone, Debug)]
pub struct PreparedTransaction {
    instructions: Vec<Instruction>,
    fee_payer: Pubkey,
    recent_blockhash: Hash,
    signers: Vec<Arc<Keypair>>,
    expected_fee: FeeAmount,
    transaction: Transaction,
}

impl PreparedTransaction {
    pub fn builder(fee_payer: Pubkey, recent_blockhash: Hash) -> TransactionBuilder {
        TransactionBuilder::new(fee_payer, recent_blockhash)
    }

    pub fn to_builder(&self) -> TransactionBuilder {
        TransactionBuilder {
            instructions: self.instructions.clone(),
            fee_payer: self.fee_payer,
            recent_blockhash: self.recent_blockhash,
            signers: self.signers.clone(),
            expected_fee: self.expected_fee,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    pub fn expected_fee(&self) -> FeeAmount {
        self.expected_fee
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Signature slot at `index` in the message's signer order, if filled.
    pub fn signature_at(&self, index: usize) -> Option<Signature> {
        self.transaction
            .signatures
            .get(index)
            .filter(|signature| **signature != Signature::default())
            .copied()
    }

    /// Signature of `signer`, located through its position among the
    /// message's required signers.
    pub fn signature_of(&self, signer: &Pubkey) -> Option<Signature> {
        let message = &self.transaction.message;
        message
            .account_keys
            .iter()
            .take(message.header.num_required_signatures.into())
            .position(|key| key == signer)
            .and_then(|index| self.signature_at(index))
    }

    pub fn signer_pubkeys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|signer| signer.pubkey()).collect()
    }

    /// Compiles the transaction into the relay backend's indexed format,
    /// carrying the signatures of the local signers.
    pub fn relay_params(&self, info: StatsInfo) -> Result<RelayTransactionParams> {
        RelayTransactionParams::from_versioned(
            &VersionedTransaction::from(self.transaction.clone()),
            &self.signer_pubkeys(),
            info,
        )
    }
}

impl PartialEq for PreparedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.instructions == other.instructions
            && self.fee_payer == other.fee_payer
            && self.recent_blockhash == other.recent_blockhash
            && self.expected_fee == other.expected_fee
            && self.transaction == other.transaction
            && self.signer_pubkeys() == other.signer_pubkeys()
    }
}

impl Eq for PreparedTransaction {}

pub struct TransactionBuilder {
    instructions: Vec<Instruction>,
    fee_payer: Pubkey,
    recent_blockhash: Hash,
    signers: Vec<Arc<Keypair>>,
    expected_fee: FeeAmount,
}

impl TransactionBuilder {
    pub fn new(fee_payer: Pubkey, recent_blockhash: Hash) -> Self {
        Self {
            instructions: Vec::new(),
            fee_payer,
            recent_blockhash,
            signers: Vec::new(),
            expected_fee: FeeAmount::ZERO,
        }
    }

    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn instructions(mut self, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    /// Adds a local signer, ignoring keypairs already present.
    pub fn signer(mut self, signer: Arc<Keypair>) -> Self {
        if !self
            .signers
            .iter()
            .any(|existing| existing.pubkey() == signer.pubkey())
        {
            self.signers.push(signer);
        }
        self
    }

    pub fn expected_fee(mut self, expected_fee: FeeAmount) -> Self {
        self.expected_fee = expected_fee;
        self
    }

    /// Compiles the message and signs it with every local signer. Slots of
    /// remote signers such as the relay fee payer stay empty.
    pub fn build(self) -> Result<PreparedTransaction> {
        let message = Message::new_with_blockhash(
            &self.instructions,
            Some(&self.fee_payer),
            &self.recent_blockhash,
        );
        let mut transaction = Transaction::new_unsigned(message);

        if !self.signers.is_empty() {
            let keypairs: Vec<&Keypair> = self.signers.iter().map(AsRef::as_ref).collect();
            transaction.try_partial_sign(keypairs.as_slice(), self.recent_blockhash)?;
        }

        Ok(PreparedTransaction {
            instructions: self.instructions,
            fee_payer: self.fee_payer,
            recent_blockhash: self.recent_blockhash,
            signers: self.signers,
            expected_fee: self.expected_fee,
            transaction,
        })
    }
}
