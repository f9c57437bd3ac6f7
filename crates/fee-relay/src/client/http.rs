use super::relay_api::{
    FeeLimitForAuthorityResponse, RelayApi, RelayApiError, RelayRequest,
    SignRelayTransactionResponse,
};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::debug;
use url::Url;

/// Relay backend reached over HTTP. Versions above 1 are addressed through a
/// `/v{version}` path prefix.
pub struct HttpRelayApiClient {
    client: Client,
    base_url: String,
    version: u8,
}

impl HttpRelayApiClient {
    pub fn new(base_url: Url, version: u8) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            version,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = if self.version > 1 {
            format!("{}/v{}{path}", self.base_url, self.version)
        } else {
            format!("{}{path}", self.base_url)
        };
        Ok(Url::parse(&url)?)
    }

    async fn response_text(response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(decode_error(status.as_u16(), body));
        }
        Ok(body)
    }
}

#[async_trait]
impl RelayApi for HttpRelayApiClient {
    async fn get_fee_payer_pubkey(&self) -> Result<Pubkey> {
        let response = self
            .client
            .get(self.endpoint("/fee_payer/pubkey")?)
            .send()
            .await?;
        let body = Self::response_text(response).await?;
        debug!(%body, "fee payer pubkey fetched");

        Ok(strip_string_response(&body).parse()?)
    }

    async fn get_free_fee_limits(
        &self,
        authority: &Pubkey,
    ) -> Result<FeeLimitForAuthorityResponse> {
        let response = self
            .client
            .get(self.endpoint(&format!("/free_fee_limits/{authority}"))?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let body = Self::response_text(response).await?;

        Ok(serde_json::from_str(&body)?)
    }

    async fn send_transaction(&self, request: RelayRequest) -> Result<Signature> {
        let response = self
            .client
            .post(self.endpoint(request.path())?)
            .json(&request)
            .send()
            .await?;
        let body = Self::response_text(response).await?;

        let signature = match &request {
            RelayRequest::SignRelayTransaction(_) => {
                serde_json::from_str::<SignRelayTransactionResponse>(&body)?.signature
            }
            _ => strip_string_response(&body).to_string(),
        };
        debug!(path = request.path(), %signature, "relay request accepted");

        parse_signature(&signature)
    }
}

fn decode_error(status: u16, body: String) -> Error {
    match serde_json::from_str::<RelayApiError>(&body) {
        Ok(err) => Error::RelayApi(err),
        Err(_) => Error::RelayApiResponse { status, body },
    }
}

/// The backend answers plain values either bare, quoted or wrapped in a
/// one-element JSON array.
fn strip_string_response(body: &str) -> &str {
    body.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .trim_matches('"')
}

fn parse_signature(signature: &str) -> Result<Signature> {
    if signature.is_empty() {
        return Err(Error::Unknown);
    }
    Ok(signature.parse()?)
}
