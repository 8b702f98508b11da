//! Best-effort contract inspection: security and gas heuristics over source
//! text, ABI function listing, and read-only call simulation.

pub mod functions;
pub mod gas;
mod patterns;
pub mod security;
pub mod simulate;
#[cfg(test)]
mod test_rpc;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::transports::TransportError;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::HttpProvider;
use crate::interfaces::{IERC20, IERC721};

pub use functions::{format_function_signature, get_contract_functions, parse_abi, ContractFunction};
pub use gas::{scan_gas_patterns, GasAnalysis};
pub use security::{analyze_contract_security, SecurityIssue};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("address {0} is not a contract")]
    NotAContract(Address),
    #[error("invalid ABI: {0}")]
    InvalidAbi(#[from] serde_json::Error),
    #[error("function `{name}` taking {arity} argument(s) not found in ABI")]
    UnknownFunction { name: String, arity: usize },
    #[error("ABI coding failed: {0}")]
    Abi(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("rpc error: {0}")]
    Rpc(#[from] TransportError),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContractInfo {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,
}

#[derive(Debug, Default)]
struct VerifiedSource {
    verified: bool,
    source_code: Option<String>,
    abi: Option<serde_json::Value>,
    compiler: Option<String>,
    optimization: Option<bool>,
    runs: Option<u32>,
}

#[derive(Debug, Default)]
struct DetectedToken {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    total_supply: Option<String>,
}

pub struct ContractAnalyzer {
    provider: Arc<HttpProvider>,
}

impl ContractAnalyzer {
    pub fn new(provider: Arc<HttpProvider>) -> Self {
        Self { provider }
    }

    pub async fn get_contract_info(&self, address: Address) -> Result<ContractInfo, AnalyzerError> {
        let code = self.provider.get_code_at(address).await?;
        if code.is_empty() {
            return Err(AnalyzerError::NotAContract(address));
        }

        let source = self.lookup_verified_source(address);
        let token = self.detect_contract_type(address).await;
        info!("Contract {} inspected ({} bytes of code)", address, code.len());

        Ok(ContractInfo {
            address,
            name: token.name,
            symbol: token.symbol,
            decimals: token.decimals,
            total_supply: token.total_supply,
            verified: source.verified,
            source_code: source.source_code,
            abi: source.abi,
            compiler: source.compiler,
            optimization: source.optimization,
            runs: source.runs,
        })
    }

    /// Runs the offline gas scan and prices it at the current network fee.
    pub async fn analyze_gas_optimization(&self, source: &str) -> Result<GasAnalysis, AnalyzerError> {
        let scan = scan_gas_patterns(source);
        let gas_price = self.provider.get_gas_price().await?;
        Ok(scan.priced(gas_price))
    }

    // TODO: query the Snowtrace contract-source API once an API key is configurable.
    fn lookup_verified_source(&self, address: Address) -> VerifiedSource {
        debug!("No verified source lookup for {}", address);
        VerifiedSource::default()
    }

    /// Tries ERC-20 then ERC-721 read functions. A failing call only means
    /// the interface is absent; fields read before the failure are kept.
    async fn detect_contract_type(&self, address: Address) -> DetectedToken {
        let mut token = DetectedToken::default();

        let erc20 = IERC20::new(address, &*self.provider);
        let erc20_reads = async {
            token.name = Some(erc20.name().call().await?._0);
            token.symbol = Some(erc20.symbol().call().await?._0);
            token.decimals = Some(erc20.decimals().call().await?._0);
            token.total_supply = Some(erc20.totalSupply().call().await?._0.to_string());
            Ok::<_, alloy::contract::Error>(())
        };
        if let Err(e) = erc20_reads.await {
            debug!("{} is not a full ERC-20: {}", address, e);
        }

        let erc721 = IERC721::new(address, &*self.provider);
        match erc721.ownerOf(U256::from(1)).call().await {
            Ok(_) => {
                if token.name.is_none() {
                    token.name = Some("NFT Contract".to_string());
                }
            }
            Err(e) => debug!("{} is not an ERC-721: {}", address, e),
        }

        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::dyn_abi::DynSolValue;
    use alloy::primitives::hex;
    use alloy::sol_types::SolCall;
    use serde_json::{json, Value};

    fn unreachable_analyzer() -> ContractAnalyzer {
        let provider = crate::client::connect("http://127.0.0.1:1").unwrap();
        ContractAnalyzer::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn test_contract_info_propagates_rpc_failure() {
        let err = unreachable_analyzer()
            .get_contract_info(Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Rpc(_)));
    }

    #[tokio::test]
    async fn test_gas_analysis_propagates_rpc_failure() {
        let result = unreachable_analyzer()
            .analyze_gas_optimization("function f() public {}")
            .await;
        assert!(matches!(result, Err(AnalyzerError::Rpc(_))));
    }

    async fn stub_analyzer(handler: test_rpc::Handler) -> ContractAnalyzer {
        let url = test_rpc::serve(handler).await;
        let provider = crate::client::connect(&url).unwrap();
        ContractAnalyzer::new(Arc::new(provider))
    }

    fn call_selector(params: &Value) -> String {
        let tx = &params[0];
        let input = tx["input"].as_str().or_else(|| tx["data"].as_str()).unwrap_or_default();
        input.chars().take(10).collect()
    }

    fn reverted() -> Value {
        json!({"code": 3, "message": "execution reverted"})
    }

    /// Deployed code that answers `name()` and reverts everything else.
    fn name_only_token(method: &str, params: &Value) -> Result<Value, Value> {
        match method {
            "eth_getCode" => Ok(json!("0x6080604052")),
            "eth_call" if call_selector(params) == hex::encode_prefixed(IERC20::nameCall::SELECTOR) => {
                let encoded = DynSolValue::Tuple(vec![DynSolValue::String("Wrapped AVAX".into())])
                    .abi_encode_params();
                Ok(json!(hex::encode_prefixed(encoded)))
            }
            "eth_call" => Err(reverted()),
            _ => Err(test_rpc::method_not_found()),
        }
    }

    /// Deployed code that only answers `ownerOf(uint256)`.
    fn bare_nft(method: &str, params: &Value) -> Result<Value, Value> {
        match method {
            "eth_getCode" => Ok(json!("0x6080604052")),
            "eth_call" if call_selector(params) == hex::encode_prefixed(IERC721::ownerOfCall::SELECTOR) => {
                Ok(json!(format!("0x{:0>64}", "1")))
            }
            "eth_call" => Err(reverted()),
            _ => Err(test_rpc::method_not_found()),
        }
    }

    fn wallet_account(method: &str, _params: &Value) -> Result<Value, Value> {
        match method {
            "eth_getCode" => Ok(json!("0x")),
            _ => Err(test_rpc::method_not_found()),
        }
    }

    #[tokio::test]
    async fn test_partial_token_keeps_fields_read_before_revert() {
        let info = stub_analyzer(name_only_token)
            .await
            .get_contract_info(Address::ZERO)
            .await
            .unwrap();

        assert_eq!(info.name.as_deref(), Some("Wrapped AVAX"));
        assert!(info.symbol.is_none());
        assert!(info.decimals.is_none());
        assert!(info.total_supply.is_none());
        assert!(!info.verified);
    }

    #[tokio::test]
    async fn test_owner_of_names_unnamed_contract() {
        let info = stub_analyzer(bare_nft)
            .await
            .get_contract_info(Address::ZERO)
            .await
            .unwrap();

        assert_eq!(info.name.as_deref(), Some("NFT Contract"));
        assert!(info.symbol.is_none());
    }

    #[tokio::test]
    async fn test_empty_code_is_not_a_contract() {
        let err = stub_analyzer(wallet_account)
            .await
            .get_contract_info(Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::NotAContract(a) if a == Address::ZERO));
    }

    #[test]
    fn test_not_a_contract_message() {
        let err = AnalyzerError::NotAContract(Address::ZERO);
        assert_eq!(
            err.to_string(),
            "address 0x0000000000000000000000000000000000000000 is not a contract"
        );
    }
}
