use crate::{
    client::{
        relay_api::{ClientEnvironment, ClientInfo, DeviceType},
        KeypairAccountStorage,
    },
    network::{Network, LOCALHOST_RPC_URL},
    Result,
};
use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Parser)]
#[command(
    term_width = 0,
    name = "Fee Relay Context",
    version = option_env!("BUILD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
)]
pub struct AppArgs {
    /// Path to the config file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Log level
    #[serde(default = "default_log")]
    pub log: String,

    /// Solana RPC URL or one of the monikers m, t, d, l
    #[serde(default = "default_sol_rpc_url")]
    sol_rpc: String,

    /// Base URL of the fee relayer backend
    relay_api: String,

    /// Relay API version, prefixed to endpoint paths as /vN above 1
    #[serde(default = "default_relay_api_version")]
    relay_api_version: u8,

    /// Network selecting the relay program id
    #[serde(default)]
    network: Network,

    /// The path to the keypair file of the relaying user
    keypair: PathBuf,

    /// Client tags forwarded to the relay backend
    #[serde(default)]
    device_type: DeviceType,
    build: Option<String>,
    #[serde(default)]
    environment: ClientEnvironment,
}

impl Settings {
    pub fn new<P: AsRef<Path>>(path: Option<P>) -> std::result::Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        if let Some(file) = path {
            builder = builder
                .add_source(File::with_name(&file.as_ref().to_string_lossy()).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("FEE_RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize())
    }

    pub fn account_storage(&self) -> Result<KeypairAccountStorage> {
        KeypairAccountStorage::from_file(&self.keypair)
    }

    pub fn sol_rpc(&self) -> Result<Url> {
        let url = match self.sol_rpc.as_str() {
            "l" | "localhost" => LOCALHOST_RPC_URL,
            url => url
                .parse::<Network>()
                .map_or(url, |network| network.default_rpc_endpoint()),
        };
        Ok(Url::parse(url)?)
    }

    pub fn relay_api(&self) -> Result<Url> {
        Ok(Url::parse(&self.relay_api)?)
    }

    pub fn relay_api_version(&self) -> u8 {
        self.relay_api_version
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            device_type: self.device_type,
            build: self.build.clone(),
            environment: self.environment,
        }
    }
}

fn default_log() -> String {
    "fee_relay=info".to_string()
}

fn default_sol_rpc_url() -> String {
    "mainnet-beta".to_string()
}

fn default_relay_api_version() -> u8 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::fs;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("fee-relay-{name}-{}.toml", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_settings_from_file_with_defaults() {
        let path = write_config(
            "defaults",
            r#"
relay_api = "https://relay.example.com"
keypair = "/tmp/id.json"
"#,
        );

        let settings = Settings::new(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(settings.log, "fee_relay=info");
        assert_eq!(
            settings.sol_rpc().unwrap().as_str(),
            "https://api.mainnet-beta.solana.com/"
        );
        assert_eq!(settings.relay_api_version(), 1);
        assert_eq!(settings.network(), Network::MainnetBeta);
        assert_eq!(settings.client_info(), ClientInfo::default());
    }

    #[test]
    fn test_settings_client_tags_and_monikers() {
        let path = write_config(
            "tags",
            r#"
sol_rpc = "d"
relay_api = "https://relay.example.com/"
relay_api_version = 2
network = "devnet"
keypair = "/tmp/id.json"
device_type = "Ios"
build = "1.2.3"
environment = "dev"
"#,
        );

        let settings = Settings::new(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            settings.sol_rpc().unwrap().as_str(),
            "https://api.devnet.solana.com/"
        );
        assert_eq!(settings.relay_api_version(), 2);
        assert_eq!(settings.network(), Network::Devnet);
        assert_eq!(
            settings.client_info(),
            ClientInfo {
                device_type: DeviceType::Ios,
                build: Some("1.2.3".to_string()),
                environment: ClientEnvironment::Dev,
            }
        );
    }

    #[test]
    fn test_sol_rpc_monikers() {
        for (index, (sol_rpc, expected)) in [
            ("t", "https://api.testnet.solana.com/"),
            ("mainnet-beta", "https://api.mainnet-beta.solana.com/"),
            ("l", "http://localhost:8899/"),
            ("https://rpc.example.com", "https://rpc.example.com/"),
        ]
        .into_iter()
        .enumerate()
        {
            let path = write_config(
                &format!("moniker-{index}"),
                &format!(
                    "sol_rpc = \"{sol_rpc}\"\nrelay_api = \"https://relay.example.com\"\nkeypair = \"/tmp/id.json\"\n"
                ),
            );

            let settings = Settings::new(Some(&path)).unwrap();
            fs::remove_file(&path).unwrap();

            assert_eq!(settings.sol_rpc().unwrap().as_str(), expected);
        }
    }

    #[test]
    fn test_invalid_urls_are_errors() {
        let path = write_config(
            "invalid",
            r#"
sol_rpc = "not a url"
relay_api = "::"
keypair = "/tmp/id.json"
"#,
        );

        let settings = Settings::new(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(matches!(settings.sol_rpc(), Err(Error::Url(_))));
        assert!(matches!(settings.relay_api(), Err(Error::Url(_))));
    }
}
