use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{utils::parse_ether, Address, Bytes};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::decode_revert_reason;
use alloy::transports::{RpcError, TransportError};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{AnalyzerError, ContractAnalyzer};

const DEFAULT_REVERT_REASON: &str = "Transaction would revert";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationResult {
    pub success: bool,
    /// True when the node answered with an execution error, false when the
    /// call never got that far (transport, encoding, unknown function).
    pub reverted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_estimate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
}

impl SimulationResult {
    fn succeeded(gas_estimate: u64, result: Value) -> Self {
        Self {
            success: true,
            reverted: false,
            gas_estimate: Some(gas_estimate),
            result: Some(result),
            error: None,
            revert_reason: None,
        }
    }

    fn failed(err: &AnalyzerError) -> Self {
        let node_reason = match err {
            AnalyzerError::Rpc(rpc) => revert_reason(rpc),
            _ => None,
        };
        let reverted = matches!(err, AnalyzerError::Rpc(RpcError::ErrorResp(_)));

        Self {
            success: false,
            reverted,
            gas_estimate: None,
            result: None,
            error: Some(err.to_string()),
            revert_reason: Some(node_reason.unwrap_or_else(|| DEFAULT_REVERT_REASON.to_string())),
        }
    }
}

impl ContractAnalyzer {
    /// Estimates gas for and statically calls `function_name` without
    /// sending a transaction. Never fails: every error is folded into an
    /// unsuccessful [`SimulationResult`].
    pub async fn simulate_transaction(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        params: &[String],
        value: &str,
    ) -> SimulationResult {
        match self.try_simulate(address, abi, function_name, params, value).await {
            Ok(result) => result,
            Err(e) => {
                info!("Simulation of {} on {} failed: {}", function_name, address, e);
                SimulationResult::failed(&e)
            }
        }
    }

    async fn try_simulate(
        &self,
        address: Address,
        abi: &JsonAbi,
        function_name: &str,
        params: &[String],
        value: &str,
    ) -> Result<SimulationResult, AnalyzerError> {
        let function = select_function(abi, function_name, params.len())?;
        let args = coerce_params(function, params)?;
        let input = function
            .abi_encode_input(&args)
            .map_err(|e| AnalyzerError::Abi(e.to_string()))?;
        let value = parse_ether(value).map_err(|e| AnalyzerError::InvalidValue(e.to_string()))?;

        let tx = TransactionRequest::default()
            .to(address)
            .input(Bytes::from(input).into())
            .value(value);

        let gas = self.provider.estimate_gas(&tx).await?;
        let output = self.provider.call(&tx).await?;
        debug!("Static call to {}::{} returned {} bytes", address, function_name, output.len());

        let decoded = function
            .abi_decode_output(&output, true)
            .map_err(|e| AnalyzerError::Abi(e.to_string()))?;
        let result = match decoded.as_slice() {
            [single] => to_json(single),
            values => Value::Array(values.iter().map(to_json).collect()),
        };

        Ok(SimulationResult::succeeded(u64::try_from(gas).unwrap_or(u64::MAX), result))
    }
}

fn select_function<'a>(
    abi: &'a JsonAbi,
    name: &str,
    arity: usize,
) -> Result<&'a Function, AnalyzerError> {
    abi.function(name)
        .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
        .ok_or_else(|| AnalyzerError::UnknownFunction {
            name: name.to_string(),
            arity,
        })
}

fn coerce_params(function: &Function, params: &[String]) -> Result<Vec<DynSolValue>, AnalyzerError> {
    function
        .inputs
        .iter()
        .zip(params)
        .map(|(input, raw)| {
            let ty: DynSolType = input.resolve().map_err(|e| AnalyzerError::Abi(e.to_string()))?;
            ty.coerce_str(raw)
                .map_err(|e| AnalyzerError::Abi(format!("parameter {}: {}", input.name, e)))
        })
        .collect()
}

fn revert_reason(err: &TransportError) -> Option<String> {
    match err {
        RpcError::ErrorResp(payload) => {
            let data = payload.data.as_ref().map(|raw| raw.get());
            reason_from_payload(&payload.message, data)
        }
        _ => None,
    }
}

/// Prefers ABI-encoded revert data, then the node's `execution reverted: ...`
/// message.
fn reason_from_payload(message: &str, data: Option<&str>) -> Option<String> {
    if let Some(raw) = data {
        if let Ok(bytes) = serde_json::from_str::<Bytes>(raw) {
            if let Some(reason) = decode_revert_reason(&bytes) {
                return Some(reason);
            }
        }
    }

    message
        .strip_prefix("execution reverted")
        .map(|rest| rest.trim_start_matches(':').trim())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => json!(b),
        DynSolValue::Int(i, _) => json!(i.to_string()),
        DynSolValue::Uint(u, _) => json!(u.to_string()),
        DynSolValue::Address(a) => json!(a.to_checksum(None)),
        DynSolValue::FixedBytes(word, size) => json!(format!("0x{}", alloy::primitives::hex::encode(&word[..*size]))),
        DynSolValue::Bytes(bytes) => json!(alloy::primitives::hex::encode_prefixed(bytes)),
        DynSolValue::String(s) => json!(s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        other => json!(format!("{other:?}")),
    }
}
