//! Read-only Avalanche C-Chain access over JSON-RPC.

pub mod format;

use alloy::primitives::utils::{format_ether, format_units};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use alloy::transports::http::{Client, Http};
use alloy::transports::TransportError;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::config::NetworkConfig;
use crate::interfaces::IERC20;
use format::{format_gwei, trim_units};

pub use format::{format_address, format_number, is_valid_address};

pub type HttpProvider = RootProvider<Http<Client>>;

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid RPC url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to fetch AVAX balance: {0}")]
    Balance(#[source] TransportError),
    #[error("rpc error: {0}")]
    Rpc(#[from] TransportError),
}

pub fn connect(rpc_url: &str) -> Result<HttpProvider, ClientError> {
    let url = Url::parse(rpc_url).map_err(|source| ClientError::InvalidUrl {
        url: rpc_url.to_string(),
        source,
    })?;
    Ok(ProviderBuilder::new().on_http(url))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GasTiers {
    pub standard: String,
    pub fast: String,
    pub fastest: String,
}

impl GasTiers {
    fn fallback() -> Self {
        Self {
            standard: "25".to_string(),
            fast: "30".to_string(),
            fastest: "35".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkSnapshot {
    pub block_number: u64,
    /// Gwei.
    pub gas_price: String,
    pub difficulty: String,
}

impl NetworkSnapshot {
    fn fallback() -> Self {
        Self {
            block_number: 0,
            gas_price: "25".to_string(),
            difficulty: "0".to_string(),
        }
    }
}

pub struct AvalancheClient {
    provider: Arc<HttpProvider>,
    network: NetworkConfig,
}

impl AvalancheClient {
    pub fn new(network: NetworkConfig) -> Result<Self, ClientError> {
        let provider = connect(&network.rpc_url)?;
        info!("Connected to {} (chain {})", network.name, network.chain_id);
        Ok(Self {
            provider: Arc::new(provider),
            network,
        })
    }

    pub fn provider(&self) -> Arc<HttpProvider> {
        self.provider.clone()
    }

    pub fn get_network_info(&self) -> &NetworkConfig {
        &self.network
    }

    /// Native balance in AVAX.
    pub async fn get_avax_balance(&self, address: Address) -> Result<String, ClientError> {
        let balance = self.provider.get_balance(address).await.map_err(|e| {
            error!("Error fetching AVAX balance for {}: {}", address, e);
            ClientError::Balance(e)
        })?;
        Ok(trim_units(format_ether(balance)))
    }

    /// Token balance in whole units, `"0"` on any failure.
    pub async fn get_token_balance(&self, token: Address, wallet: Address) -> String {
        let contract = IERC20::new(token, &*self.provider);
        let balance_call = contract.balanceOf(wallet);
        let decimals_call = contract.decimals();

        match tokio::try_join!(balance_call.call(), decimals_call.call()) {
            Ok((balance, decimals)) => format_units(balance._0, decimals._0)
                .map(trim_units)
                .unwrap_or_else(|_| "0".to_string()),
            Err(e) => {
                warn!("Error fetching token {} balance for {}: {}", token, wallet, e);
                "0".to_string()
            }
        }
    }

    pub async fn get_transaction_count(&self, address: Address) -> Result<u64, ClientError> {
        Ok(self.provider.get_transaction_count(address).await?)
    }

    /// Logs whose first indexed topic is `address`, at most 50.
    pub async fn get_transaction_history(
        &self,
        address: Address,
        from_block: u64,
        to_block: BlockNumberOrTag,
    ) -> Vec<Log> {
        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .topic1(address.into_word());

        match self.provider.get_logs(&filter).await {
            Ok(mut logs) => {
                logs.truncate(HISTORY_LIMIT);
                logs
            }
            Err(e) => {
                error!("Error fetching transaction history for {}: {}", address, e);
                Vec::new()
            }
        }
    }

    pub async fn get_gas_price(&self) -> GasTiers {
        match self.provider.get_gas_price().await {
            Ok(price) => GasTiers {
                standard: format_gwei(price),
                fast: format_gwei(price * 12 / 10),
                fastest: format_gwei(price * 3 / 2),
            },
            Err(e) => {
                error!("Error fetching gas price: {}", e);
                GasTiers::fallback()
            }
        }
    }

    pub async fn get_network_stats(&self) -> NetworkSnapshot {
        let (block, gas_price) = tokio::join!(
            self.provider.get_block_by_number(BlockNumberOrTag::Latest, false),
            self.provider.get_gas_price()
        );

        match (block, gas_price) {
            (Ok(block), Ok(price)) => NetworkSnapshot {
                block_number: block
                    .as_ref()
                    .and_then(|b| b.header.number)
                    .unwrap_or_default(),
                gas_price: format_gwei(price),
                difficulty: block
                    .map(|b| b.header.difficulty)
                    .unwrap_or(U256::ZERO)
                    .to_string(),
            },
            (Err(e), _) | (_, Err(e)) => {
                error!("Error fetching network stats: {}", e);
                NetworkSnapshot::fallback()
            }
        }
    }

    pub async fn get_code(&self, address: Address) -> Result<Bytes, ClientError> {
        Ok(self.provider.get_code_at(address).await?)
    }

    pub async fn is_contract(&self, address: Address) -> bool {
        self.get_code(address)
            .await
            .map(|code| !code.is_empty())
            .unwrap_or(false)
    }
}
