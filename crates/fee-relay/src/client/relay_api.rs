use crate::{swap::SwapData, Error, Result};
use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize, Serializer};
use solana_sdk::{
    hash::Hash,
    instruction::CompiledInstruction,
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::{collections::BTreeMap, fmt};

/// Remote fee relayer backend.
#[automock]
#[async_trait]
pub trait RelayApi: Send + Sync {
    async fn get_fee_payer_pubkey(&self) -> Result<Pubkey>;

    async fn get_free_fee_limits(&self, authority: &Pubkey)
        -> Result<FeeLimitForAuthorityResponse>;

    async fn send_transaction(&self, request: RelayRequest) -> Result<Signature>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayRequest {
    RelayTransaction(RelayTransactionParams),
    SignRelayTransaction(RelayTransactionParams),
    RelayTopUpWithSwap(TopUpWithSwapParams),
}

impl RelayRequest {
    pub fn path(&self) -> &'static str {
        match self {
            Self::RelayTransaction(_) => "/relay_transaction",
            Self::SignRelayTransaction(_) => "/sign_relay_transaction",
            Self::RelayTopUpWithSwap(_) => "/relay_top_up_with_swap",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum OperationType {
    TopUp,
    #[default]
    Transfer,
    Swap,
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    Web,
    Android,
    Ios,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientEnvironment {
    Dev,
    #[default]
    Release,
}

/// Identifies the calling client to the relay backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub device_type: DeviceType,
    pub build: Option<String>,
    pub environment: ClientEnvironment,
}

impl ClientInfo {
    pub fn stats_info(&self, operation_type: OperationType, currency: Option<String>) -> StatsInfo {
        StatsInfo {
            operation_type,
            device_type: self.device_type,
            currency,
            build: self.build.clone(),
            environment: self.environment,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatsInfo {
    pub operation_type: OperationType,
    pub device_type: DeviceType,
    pub currency: Option<String>,
    pub build: Option<String>,
    pub environment: ClientEnvironment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayAccountMeta {
    pub pubkey: u8,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayInstruction {
    pub program_id: u8,
    pub accounts: Vec<RelayAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled transaction as accepted by `/relay_transaction` and
/// `/sign_relay_transaction`: instructions reference accounts by index into
/// `pubkeys`, and signatures are keyed by signer index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayTransactionParams {
    pub instructions: Vec<RelayInstruction>,
    #[serde(serialize_with = "as_display_map")]
    pub signatures: BTreeMap<u8, Signature>,
    #[serde(serialize_with = "as_display_seq")]
    pub pubkeys: Vec<Pubkey>,
    #[serde(serialize_with = "as_display")]
    pub blockhash: Hash,
    pub info: StatsInfo,
}

impl RelayTransactionParams {
    /// Compiles `transaction`, keeping the signatures of `local_signers` only.
    /// Fails with [`Error::InvalidSignature`] when a local signer is not a
    /// signing account of the message or has not signed yet.
    pub fn from_versioned(
        transaction: &VersionedTransaction,
        local_signers: &[Pubkey],
        info: StatsInfo,
    ) -> Result<Self> {
        let message = &transaction.message;
        let keys = message.static_account_keys();
        let header = message.header();

        let mut signatures = BTreeMap::new();
        for signer in local_signers {
            let index = keys
                .iter()
                .take(header.num_required_signatures.into())
                .position(|key| key == signer)
                .ok_or(Error::InvalidSignature)?;
            let signature = transaction
                .signatures
                .get(index)
                .filter(|signature| **signature != Signature::default())
                .ok_or(Error::InvalidSignature)?;
            signatures.insert(index as u8, *signature);
        }

        Ok(Self {
            instructions: compile_instructions(message, message.instructions()),
            signatures,
            pubkeys: keys.to_vec(),
            blockhash: *message.recent_blockhash(),
            info,
        })
    }
}

fn compile_instructions(
    message: &VersionedMessage,
    instructions: &[CompiledInstruction],
) -> Vec<RelayInstruction> {
    let header = message.header();
    let num_keys = message.static_account_keys().len();

    instructions
        .iter()
        .map(|ix| RelayInstruction {
            program_id: ix.program_id_index,
            accounts: ix
                .accounts
                .iter()
                .map(|&index| RelayAccountMeta {
                    pubkey: index,
                    is_signer: usize::from(index) < usize::from(header.num_required_signatures),
                    is_writable: is_writable_index(header, num_keys, index.into()),
                })
                .collect(),
            data: ix.data.clone(),
        })
        .collect()
}

fn is_writable_index(header: &MessageHeader, num_keys: usize, index: usize) -> bool {
    let num_signed = usize::from(header.num_required_signatures);
    if index < num_signed {
        index < num_signed.saturating_sub(header.num_readonly_signed_accounts.into())
    } else {
        index < num_keys.saturating_sub(header.num_readonly_unsigned_accounts.into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SwapTransactionSignatures {
    #[serde(serialize_with = "as_display")]
    pub user_authority_signature: Signature,
    #[serde(serialize_with = "as_display_opt")]
    pub transfer_authority_signature: Option<Signature>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TopUpWithSwapParams {
    #[serde(serialize_with = "as_display")]
    pub user_source_token_account_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub source_token_mint_pubkey: Pubkey,
    #[serde(serialize_with = "as_display")]
    pub user_authority_pubkey: Pubkey,
    pub top_up_swap: SwapData,
    pub fee_amount: u64,
    pub signatures: SwapTransactionSignatures,
    #[serde(serialize_with = "as_display")]
    pub blockhash: Hash,
    pub info: StatsInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FeeLimitForAuthorityResponse {
    pub authority: Vec<u8>,
    pub limits: Limits,
    pub processed_fee: ProcessedFee,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Limits {
    pub use_free_fee: bool,
    pub max_fee_amount: u64,
    pub max_fee_count: u64,
    pub max_token_account_creation_amount: u64,
    pub max_token_account_creation_count: u64,
    pub period: Period,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Period {
    pub secs: u64,
    pub nanos: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProcessedFee {
    pub total_fee_amount: u64,
    pub fee_count: u64,
    pub rent_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignRelayTransactionResponse {
    pub signature: String,
    #[allow(dead_code)]
    pub transaction: String,
}

/// Error body returned by the relay backend on non-success responses.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RelayApiError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayClientErrorKind {
    InsufficientFunds,
    MaximumNumberOfInstructionsAllowedExceeded,
    ConnectionClosedBeforeMessageCompleted,
    GivenPoolTokenAmountResultsInZeroTradingTokens,
    SwapInstructionExceedsDesiredSlippageLimit,
}

impl fmt::Display for RelayClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InsufficientFunds => "Insufficient funds",
            Self::MaximumNumberOfInstructionsAllowedExceeded => {
                "Exceeded maximum number of instructions allowed"
            }
            Self::ConnectionClosedBeforeMessageCompleted => {
                "Connection closed before message completed"
            }
            Self::GivenPoolTokenAmountResultsInZeroTradingTokens => {
                "Given pool token amount results in zero trading tokens"
            }
            Self::SwapInstructionExceedsDesiredSlippageLimit => {
                "Swap instruction exceeds desired slippage limit"
            }
        };
        write!(f, "{msg}")
    }
}

const CLIENT_ERROR_TYPE: &str = "ClientError";
const ERROR_LOG_PREFIXES: [&str; 3] = [
    "Program failed to complete: ",
    "Program log: Error: ",
    "Transfer: ",
];

impl RelayApiError {
    pub fn error_type(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.keys().next())
            .map(String::as_str)
    }

    fn raw_client_log(&self) -> Option<&str> {
        if self.error_type() != Some(CLIENT_ERROR_TYPE) {
            return None;
        }
        self.data
            .as_ref()?
            .get(CLIENT_ERROR_TYPE)?
            .as_array()?
            .first()?
            .as_str()
    }

    /// Quoted `Program ...` and `Transfer: ...` entries found in the
    /// client error payload.
    pub fn program_logs(&self) -> Option<Vec<String>> {
        let raw = self.raw_client_log()?;
        let logs = raw
            .split('"')
            .skip(1)
            .step_by(2)
            .filter(|log| log.starts_with("Program ") || log.starts_with("Transfer: "))
            .map(str::to_string)
            .collect();
        Some(logs)
    }

    /// First program log that reads like the failure cause, with its prefix
    /// stripped.
    pub fn error_log(&self) -> Option<String> {
        if self.is_connection_closed() {
            return Some("connection closed before message completed".to_string());
        }
        let logs = self.program_logs()?;
        logs.iter().find_map(|log| {
            if log.starts_with("Transfer: ") && !log.starts_with("Transfer: insufficient lamports")
            {
                return None;
            }
            ERROR_LOG_PREFIXES
                .iter()
                .find_map(|prefix| log.strip_prefix(prefix))
                .map(str::to_string)
        })
    }

    pub fn client_error_kind(&self) -> Option<RelayClientErrorKind> {
        if self.error_type() != Some(CLIENT_ERROR_TYPE) {
            return None;
        }
        if self.is_connection_closed() {
            return Some(RelayClientErrorKind::ConnectionClosedBeforeMessageCompleted);
        }

        let log = self.error_log()?;
        if log.contains("exceeded maximum number of instructions allowed") {
            Some(RelayClientErrorKind::MaximumNumberOfInstructionsAllowedExceeded)
        } else if log.contains("insufficient funds") || log.contains("insufficient lamports") {
            Some(RelayClientErrorKind::InsufficientFunds)
        } else if log.contains("Given pool token amount results in zero trading tokens") {
            Some(RelayClientErrorKind::GivenPoolTokenAmountResultsInZeroTradingTokens)
        } else if log.contains("Swap instruction exceeds desired slippage limit") {
            Some(RelayClientErrorKind::SwapInstructionExceedsDesiredSlippageLimit)
        } else {
            None
        }
    }

    fn is_connection_closed(&self) -> bool {
        self.message
            .contains("connection closed before message completed")
    }
}

pub(crate) fn as_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn as_display_opt<T: fmt::Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

fn as_display_seq<T: fmt::Display, S: Serializer>(
    values: &[T],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(ToString::to_string))
}

fn as_display_map<K: fmt::Display, V: fmt::Display, S: Serializer>(
    values: &BTreeMap<K, V>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(
        values
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        message::Message,
        signature::{Keypair, Signer},
        transaction::Transaction,
    };
    use solana_system_interface::instruction::transfer;

    #[test]
    fn test_request_paths() {
        let params = RelayTransactionParams {
            instructions: vec![],
            signatures: BTreeMap::new(),
            pubkeys: vec![],
            blockhash: Hash::default(),
            info: ClientInfo::default().stats_info(OperationType::Transfer, None),
        };

        assert_eq!(
            RelayRequest::RelayTransaction(params.clone()).path(),
            "/relay_transaction"
        );
        assert_eq!(
            RelayRequest::SignRelayTransaction(params).path(),
            "/sign_relay_transaction"
        );
    }

    #[test]
    fn test_relay_transaction_params_from_signed_transaction() {
        let owner = Keypair::new();
        let fee_payer = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let blockhash = Hash::new_unique();

        let message = Message::new_with_blockhash(
            &[transfer(&owner.pubkey(), &recipient, 50_000)],
            Some(&fee_payer),
            &blockhash,
        );
        let mut transaction = Transaction::new_unsigned(message);
        transaction.partial_sign(&[&owner], blockhash);
        let transaction = VersionedTransaction::from(transaction);

        let info = ClientInfo::default().stats_info(OperationType::Transfer, None);
        let params =
            RelayTransactionParams::from_versioned(&transaction, &[owner.pubkey()], info).unwrap();

        assert_eq!(params.pubkeys[0], fee_payer);
        assert_eq!(params.pubkeys[1], owner.pubkey());
        assert_eq!(params.blockhash, blockhash);
        assert_eq!(params.signatures.len(), 1);
        assert_eq!(params.signatures[&1], transaction.signatures[1]);

        let ix = &params.instructions[0];
        assert_eq!(params.pubkeys[usize::from(ix.program_id)], solana_system_interface::program::ID);
        assert_eq!(
            ix.accounts[0],
            RelayAccountMeta {
                pubkey: 1,
                is_signer: true,
                is_writable: true,
            }
        );
        assert!(!ix.accounts[1].is_signer);
        assert!(ix.accounts[1].is_writable);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["signatures"]["1"], transaction.signatures[1].to_string());
        assert_eq!(json["pubkeys"][0], fee_payer.to_string());
        assert_eq!(json["info"]["operation_type"], "Transfer");
    }

    #[test]
    fn test_relay_transaction_params_reject_unknown_signer() {
        let owner = Keypair::new();
        let blockhash = Hash::new_unique();
        let message = Message::new_with_blockhash(
            &[transfer(&owner.pubkey(), &Pubkey::new_unique(), 1)],
            Some(&owner.pubkey()),
            &blockhash,
        );
        let transaction = VersionedTransaction::from(Transaction::new(&[&owner], message, blockhash));

        let info = ClientInfo::default().stats_info(OperationType::Transfer, None);
        let result =
            RelayTransactionParams::from_versioned(&transaction, &[Pubkey::new_unique()], info);

        assert!(matches!(result, Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_decode_fee_limits() {
        let body = r#"{
            "authority": [1, 2, 3],
            "limits": {
                "use_free_fee": true,
                "max_fee_amount": 10000000,
                "max_fee_count": 100,
                "max_token_account_creation_amount": 10000000,
                "max_token_account_creation_count": 30,
                "period": { "secs": 86400, "nanos": 0 }
            },
            "processed_fee": { "total_fee_amount": 15000, "fee_count": 3, "rent_count": 0 }
        }"#;

        let response: FeeLimitForAuthorityResponse = serde_json::from_str(body).unwrap();
        assert!(response.limits.use_free_fee);
        assert_eq!(response.limits.max_fee_count, 100);
        assert_eq!(response.limits.period.secs, 86400);
        assert_eq!(response.processed_fee.total_fee_amount, 15000);
    }

    #[test]
    fn test_client_error_classification() {
        let error: RelayApiError = serde_json::from_str(
            r#"{"code":6,"message":"error","data":{"ClientError":["logs: [\"Program 11111111111111111111111111111111 invoke [1]\", \"Program log: Error: exceeded maximum number of instructions allowed (200000) at instruction #1581\", \"Program 11111111111111111111111111111111 failed\"]"]}}"#,
        )
        .unwrap();

        assert_eq!(error.error_type(), Some("ClientError"));
        assert_eq!(error.program_logs().map(|logs| logs.len()), Some(3));
        assert_eq!(
            error.error_log().as_deref(),
            Some("exceeded maximum number of instructions allowed (200000) at instruction #1581")
        );
        assert_eq!(
            error.client_error_kind(),
            Some(RelayClientErrorKind::MaximumNumberOfInstructionsAllowedExceeded)
        );
    }

    #[test]
    fn test_connection_closed_error() {
        let error: RelayApiError = serde_json::from_str(
            r#"{"code":6,"message":"connection closed before message completed","data":{"ClientError":[]}}"#,
        )
        .unwrap();

        assert_eq!(
            error.client_error_kind(),
            Some(RelayClientErrorKind::ConnectionClosedBeforeMessageCompleted)
        );
    }

    #[test]
    fn test_non_client_error_has_no_logs() {
        let error: RelayApiError =
            serde_json::from_str(r#"{"code":1,"message":"bad pubkey","data":{"ParsePubkeyError":["Invalid"]}}"#)
                .unwrap();

        assert_eq!(error.error_type(), Some("ParsePubkeyError"));
        assert_eq!(error.program_logs(), None);
        assert_eq!(error.client_error_kind(), None);
    }
}
