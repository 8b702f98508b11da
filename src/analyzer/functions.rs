use serde::{Deserialize, Serialize};

use super::AnalyzerError;

const BASE_CALL_GAS: u64 = 21_000;
const CALL_OVERHEAD_GAS: u64 = 5_000;
const PER_INPUT_GAS: u64 = 1_000;
const STATE_CHANGE_GAS: u64 = 20_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Function,
    Constructor,
    Receive,
    Fallback,
    Event,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    #[default]
    NonPayable,
    Payable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// One entry of a JSON ABI, read leniently: missing `inputs`/`outputs` are
/// empty. Entries without a `type` are never listed as functions.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<EntryKind>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    /// Absent in pre-0.4.16 ABIs.
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: Option<Mutability>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContractFunction {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub state_mutability: Mutability,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub gas_estimate: Option<u64>,
}

pub fn parse_abi(json: &str) -> Result<Vec<AbiEntry>, AnalyzerError> {
    Ok(serde_json::from_str(json)?)
}

/// Function entries in ABI order.
pub fn get_contract_functions(abi: &[AbiEntry]) -> Vec<ContractFunction> {
    abi.iter()
        .filter(|entry| entry.kind == Some(EntryKind::Function))
        .map(|entry| ContractFunction {
            name: entry.name.clone(),
            kind: EntryKind::Function,
            state_mutability: entry.state_mutability.unwrap_or_default(),
            inputs: entry.inputs.clone(),
            outputs: entry.outputs.clone(),
            gas_estimate: Some(estimate_function_gas(entry.state_mutability, entry.inputs.len())),
        })
        .collect()
}

/// Flat signature heuristic. Read-only calls are free when made externally;
/// the state-change cost applies only to a declared payable/nonpayable.
pub fn estimate_function_gas(mutability: Option<Mutability>, input_count: usize) -> u64 {
    let call = BASE_CALL_GAS + CALL_OVERHEAD_GAS + PER_INPUT_GAS * input_count as u64;
    match mutability {
        Some(Mutability::Pure | Mutability::View) => 0,
        Some(Mutability::NonPayable | Mutability::Payable) => call + STATE_CHANGE_GAS,
        None => call,
    }
}

pub fn format_function_signature(func: &ContractFunction) -> String {
    let params = func
        .inputs
        .iter()
        .map(|input| format!("{} {}", input.ty, input.name))
        .collect::<Vec<_>>()
        .join(", ");
    let returns = if func.outputs.is_empty() {
        String::new()
    } else {
        let types = func.outputs.iter().map(|o| o.ty.as_str()).collect::<Vec<_>>().join(", ");
        format!(" returns ({types})")
    };

    format!("function {}({}){}", func.name, params, returns)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABI: &str = r#"[
        {"type": "constructor", "inputs": [{"name": "owner", "type": "address"}]},
        {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
         "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}],
         "outputs": [{"name": "", "type": "bool"}]},
        {"type": "event", "name": "Transfer", "inputs": []},
        {"type": "function", "name": "allowance", "stateMutability": "view",
         "inputs": [{"name": "owner", "type": "address"}, {"name": "spender", "type": "address"}],
         "outputs": [{"name": "", "type": "uint256"}]},
        {"type": "function", "name": "deposit", "stateMutability": "payable", "inputs": []},
        {"type": "function", "name": "legacy"}
    ]"#;

    #[test]
    fn test_single_view_function_is_free() {
        let abi = parse_abi(
            r#"[{"type": "function", "name": "allowance", "stateMutability": "view",
                 "inputs": [{"name": "owner", "type": "address"}, {"name": "spender", "type": "address"}],
                 "outputs": [{"name": "", "type": "uint256"}]}]"#,
        )
        .unwrap();

        let functions = get_contract_functions(&abi);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].gas_estimate, Some(0));
    }

    #[test]
    fn test_only_functions_in_abi_order() {
        let functions = get_contract_functions(&parse_abi(ABI).unwrap());
        let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["transfer", "allowance", "deposit", "legacy"]);
        assert!(functions.iter().all(|f| f.kind == EntryKind::Function));
    }

    #[test]
    fn test_gas_heuristic() {
        let functions = get_contract_functions(&parse_abi(ABI).unwrap());
        // 21000 + 5000 + 2 * 1000 + 20000
        assert_eq!(functions[0].gas_estimate, Some(48_000));
        assert_eq!(functions[2].gas_estimate, Some(46_000));
    }

    #[test]
    fn test_missing_fields_default() {
        let functions = get_contract_functions(&parse_abi(ABI).unwrap());
        let legacy = &functions[3];
        assert_eq!(legacy.state_mutability, Mutability::NonPayable);
        assert!(legacy.inputs.is_empty());
        assert!(legacy.outputs.is_empty());
    }

    #[test]
    fn test_undeclared_mutability_skips_state_change_cost() {
        let abi = parse_abi(
            r#"[
                {"type": "function", "name": "legacy", "inputs": []},
                {"name": "untyped", "stateMutability": "view"},
                {"type": "function", "name": "oldView", "constant": true,
                 "inputs": [{"name": "who", "type": "address"}],
                 "outputs": [{"name": "", "type": "uint256"}]}
            ]"#,
        )
        .unwrap();

        let functions = get_contract_functions(&abi);
        let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["legacy", "oldView"]);
        assert_eq!(functions[0].gas_estimate, Some(26_000));
        assert_eq!(functions[1].gas_estimate, Some(27_000));
        assert_eq!(functions[1].state_mutability, Mutability::NonPayable);
    }

    #[test]
    fn test_estimate_by_declared_mutability() {
        assert_eq!(estimate_function_gas(Some(Mutability::Pure), 3), 0);
        assert_eq!(estimate_function_gas(Some(Mutability::Payable), 0), 46_000);
        assert_eq!(estimate_function_gas(None, 2), 28_000);
    }

    #[test]
    fn test_signature_formatting() {
        let functions = get_contract_functions(&parse_abi(ABI).unwrap());
        assert_eq!(
            format_function_signature(&functions[0]),
            "function transfer(address to, uint256 amount) returns (bool)"
        );
        assert_eq!(format_function_signature(&functions[2]), "function deposit()");
    }

    #[test]
    fn test_invalid_abi() {
        assert!(matches!(parse_abi("{not json"), Err(AnalyzerError::InvalidAbi(_))));
    }
}
