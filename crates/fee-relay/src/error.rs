use crate::client::relay_api::{RelayApiError, RelayClientErrorKind};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    program_error::ProgramError,
    pubkey::ParsePubkeyError,
    signature::{ParseSignatureError, Signature},
    signer::SignerError,
};
use thiserror::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown fee relayer error")]
    Unknown,
    #[error("relay context is not loaded")]
    InvalidContext,
    #[error("no account available for signing")]
    Unauthorized,
    #[error("swap pools not found")]
    SwapPoolsNotFound,
    #[error("transit token mint not found")]
    TransitTokenMintNotFound,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("invalid network: {0}, expected mainnet-beta, testnet or devnet")]
    InvalidNetwork(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("transaction fee payer does not match the relay fee payer")]
    InvalidFeePayer,
    #[error("relay context changed before the operation could run")]
    InconsistentRelayContext,
    #[error("top up succeeded but the transaction failed: {source}")]
    TopUpSucceededButTransactionFailed {
        logs: Option<Vec<String>>,
        #[source]
        source: Box<Error>,
    },
    #[error("relay api error {}: {}", .0.code, .0.message)]
    RelayApi(RelayApiError),
    #[error("relay api responded with status {status}: {body}")]
    RelayApiResponse { status: u16, body: String },
    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },
    #[error("transaction not confirmed: {0}")]
    SignatureNotConfirmed(Signature),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pubkey: {0}")]
    PubkeyInvalid(#[from] ParsePubkeyError),
    #[error("program error: {0}")]
    Program(#[from] ProgramError),
    #[error("rpc client error: {0}")]
    RpcClient(#[from] ClientError),
    #[error("invalid transaction signature: {0}")]
    SignatureParse(#[from] ParseSignatureError),
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Numeric code reported by the relay backend for the domain error kinds.
    pub fn code(&self) -> i64 {
        match self {
            Self::SwapPoolsNotFound => -3,
            Self::TransitTokenMintNotFound => -4,
            Self::InvalidAmount => -5,
            Self::InvalidSignature => -6,
            Self::InvalidFeePayer => -9,
            Self::TopUpSucceededButTransactionFailed { .. } => -12,
            Self::InconsistentRelayContext => -14,
            Self::RelayApi(err) => err.code,
            _ => -1,
        }
    }

    /// Program logs carried by the error, if the failure came from a simulated
    /// or relayed transaction.
    pub fn program_logs(&self) -> Option<Vec<String>> {
        match self {
            Self::RelayApi(err) => err.program_logs(),
            Self::TopUpSucceededButTransactionFailed { logs, .. } => logs.clone(),
            Self::RpcClient(err) => match err.kind() {
                ClientErrorKind::RpcError(RpcError::RpcResponseError {
                    data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
                    ..
                }) => result.logs.clone(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Classification of a relay backend client error, when one applies.
    pub fn relay_client_error(&self) -> Option<RelayClientErrorKind> {
        match self {
            Self::RelayApi(err) => err.client_error_kind(),
            Self::TopUpSucceededButTransactionFailed { source, .. } => {
                source.relay_client_error()
            }
            _ => None,
        }
    }

    pub(crate) fn top_up_succeeded_but_transaction_failed(source: Error) -> Self {
        Self::TopUpSucceededButTransactionFailed {
            logs: source.program_logs(),
            source: Box::new(source),
        }
    }
}
