use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use config::{Config, ConfigError, Environment, File};
use alloy::primitives::{address, Address};

use crate::price::PriceData;
use crate::rules::AlertCondition;

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub symbol: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub coingecko_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default)]
    pub coingecko_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub fallback: PriceData,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_secs: 10,
            fallback: PriceData::snapshot(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub store_path: PathBuf,
    pub refresh_interval_secs: u64,
    pub auto_refresh: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("avalanche-wallet-store.json"),
            refresh_interval_secs: 30,
            auto_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub webhook_url: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub cooldown_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            cooldown_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceAlertConfig {
    pub asset: String,
    pub condition: AlertCondition,
    pub price: f64,
    #[serde(default = "enabled")]
    pub active: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: String,
    pub networks: HashMap<String, NetworkConfig>,
    pub tokens: Vec<TokenConfig>,
    pub price: PriceConfig,
    pub wallet: WalletConfig,
    pub alerts: AlertsConfig,
    pub price_alerts: Vec<PriceAlertConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: "mainnet".to_string(),
            networks: default_networks(),
            tokens: default_tokens(),
            price: PriceConfig::default(),
            wallet: WalletConfig::default(),
            alerts: AlertsConfig::default(),
            price_alerts: Vec::new(),
        }
    }
}

fn default_networks() -> HashMap<String, NetworkConfig> {
    let mut networks = HashMap::new();
    networks.insert(
        "mainnet".to_string(),
        NetworkConfig {
            chain_id: 43114,
            name: "Avalanche C-Chain".to_string(),
            symbol: "AVAX".to_string(),
            rpc_url: "https://api.avax.network/ext/bc/C/rpc".to_string(),
            explorer_url: "https://snowtrace.io".to_string(),
            coingecko_id: "avalanche-2".to_string(),
        },
    );
    networks.insert(
        "testnet".to_string(),
        NetworkConfig {
            chain_id: 43113,
            name: "Avalanche Fuji Testnet".to_string(),
            symbol: "AVAX".to_string(),
            rpc_url: "https://api.avax-test.network/ext/bc/C/rpc".to_string(),
            explorer_url: "https://testnet.snowtrace.io".to_string(),
            coingecko_id: "avalanche-2".to_string(),
        },
    );
    networks
}

fn token(address: Address, symbol: &str, name: &str, decimals: u8, coingecko_id: &str) -> TokenConfig {
    TokenConfig {
        address,
        symbol: symbol.to_string(),
        name: name.to_string(),
        decimals,
        coingecko_id: Some(coingecko_id.to_string()),
    }
}

fn default_tokens() -> Vec<TokenConfig> {
    vec![
        token(address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"), "USDC", "USD Coin", 6, "usd-coin"),
        token(address!("9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7"), "USDt", "Tether USD", 6, "tether"),
        token(address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7"), "WAVAX", "Wrapped AVAX", 18, "wrapped-avax"),
        token(address!("60781C2586D68229fde47564546784ab3fACA982"), "PNG", "Pangolin", 18, "pangolin"),
        token(address!("6e84a6216eA6dACC71eE8E6b0a5B7322EEbC0fDd"), "JOE", "JoeToken", 18, "joe"),
    ]
}

impl AppConfig {
    /// Defaults, then `config.toml` (or `path`), then `AVAX_INSIGHT__*` env vars.
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::with_name(p).required(true),
            None => File::with_name("config").required(false),
        };

        let builder = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("AVAX_INSIGHT").separator("__"));

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// The active network, by name.
    pub fn active_network(&self) -> Result<&NetworkConfig, ConfigError> {
        self.networks
            .get(&self.network)
            .ok_or_else(|| ConfigError::NotFound(format!("networks.{}", self.network)))
    }

    pub fn active_network_mut(&mut self) -> Option<&mut NetworkConfig> {
        self.networks.get_mut(&self.network)
    }
}
