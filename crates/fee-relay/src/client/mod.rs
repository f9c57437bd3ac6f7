pub mod account;
pub mod http;
pub mod relay_api;
pub mod rpc;

pub use account::{AccountStorage, KeypairAccountStorage};
pub use http::HttpRelayApiClient;
pub use relay_api::{RelayApi, RelayRequest};
pub use rpc::{SolanaRpc, SolanaRpcClient};
