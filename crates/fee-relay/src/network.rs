use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const LOCALHOST_RPC_URL: &str = "http://localhost:8899";

/// Cluster the relay program and fee relayer run against. Testnet shares the
/// devnet relay program deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[default]
    #[serde(rename = "mainnet-beta")]
    MainnetBeta,
    #[serde(rename = "testnet")]
    Testnet,
    #[serde(rename = "devnet")]
    Devnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
        }
    }

    pub fn default_rpc_endpoint(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the cluster name or its one-letter moniker.
impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" | "mainnet-beta" => Ok(Self::MainnetBeta),
            "t" | "testnet" => Ok(Self::Testnet),
            "d" | "devnet" => Ok(Self::Devnet),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monikers_and_names() {
        for (input, network) in [
            ("m", Network::MainnetBeta),
            ("mainnet-beta", Network::MainnetBeta),
            ("t", Network::Testnet),
            ("devnet", Network::Devnet),
        ] {
            assert_eq!(input.parse::<Network>().unwrap(), network);
        }

        assert!(matches!(
            "https://rpc.example.com".parse::<Network>(),
            Err(Error::InvalidNetwork(input)) if input == "https://rpc.example.com"
        ));
        assert!("l".parse::<Network>().is_err());
    }

    #[test]
    fn test_settings_names_round_trip_through_display() {
        for network in [Network::MainnetBeta, Network::Testnet, Network::Devnet] {
            let json = serde_json::to_string(&network).unwrap();
            assert_eq!(json, format!("\"{network}\""));
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
    }
}
