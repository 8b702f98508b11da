use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use serde::Serialize;

use super::patterns::{INEFFICIENT_LOOPS, STORAGE_ACCESS};
use crate::client::format::{format_gwei, trim_units};

pub const BASE_TX_GAS: u64 = 21_000;
pub const FUNCTION_CALL_GAS: u64 = 50_000;
pub const STORAGE_GAS: u64 = 20_000;
/// Used for the total cost when the node reports a zero gas price.
pub const DEFAULT_GAS_PRICE_WEI: u128 = 25_000_000_000;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GasAnalysis {
    pub estimated_gas: u64,
    /// Gwei.
    pub gas_price: String,
    /// AVAX.
    pub total_cost: String,
    pub optimizations: Vec<String>,
    pub inefficiencies: Vec<String>,
}

/// The offline part of a gas analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GasScan {
    pub estimated_gas: u64,
    pub optimizations: Vec<String>,
    pub inefficiencies: Vec<String>,
}

pub fn scan_gas_patterns(source: &str) -> GasScan {
    let mut scan = GasScan::default();

    for (index, line) in source.split('\n').enumerate() {
        let line_no = index + 1;
        for pattern in INEFFICIENT_LOOPS.iter() {
            if pattern.is_match(line) {
                scan.inefficiencies
                    .push(format!("Line {line_no}: Inefficient loop with .length access"));
                scan.optimizations.push("Cache array length before loop".to_string());
            }
        }
        for pattern in STORAGE_ACCESS.iter() {
            if pattern.is_match(line) {
                scan.inefficiencies
                    .push(format!("Line {line_no}: Frequent storage access detected"));
                scan.optimizations
                    .push("Use memory variables to reduce storage reads".to_string());
            }
        }
    }

    scan.estimated_gas = BASE_TX_GAS;
    if source.contains("function") {
        scan.estimated_gas += FUNCTION_CALL_GAS;
    }
    if source.contains("storage") {
        scan.estimated_gas += STORAGE_GAS;
    }

    scan
}

impl GasScan {
    /// Prices the estimate at `gas_price_wei`.
    pub fn priced(self, gas_price_wei: u128) -> GasAnalysis {
        let effective = if gas_price_wei == 0 { DEFAULT_GAS_PRICE_WEI } else { gas_price_wei };
        let total = U256::from(self.estimated_gas) * U256::from(effective);

        GasAnalysis {
            estimated_gas: self.estimated_gas,
            gas_price: format_gwei(gas_price_wei),
            total_cost: trim_units(format_ether(total)),
            optimizations: self.optimizations,
            inefficiencies: self.inefficiencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_cost_only() {
        let scan = scan_gas_patterns("uint256 x;");
        assert_eq!(scan.estimated_gas, 21_000);
        assert!(scan.optimizations.is_empty());
        assert!(scan.inefficiencies.is_empty());
    }

    #[test]
    fn test_flat_increments() {
        let scan = scan_gas_patterns("function set(uint256 v) public {\n    Data storage d = data;\n}");
        assert_eq!(scan.estimated_gas, 21_000 + 50_000 + 20_000);
        assert_eq!(scan.inefficiencies, vec!["Line 2: Frequent storage access detected"]);
    }

    #[test]
    fn test_loop_and_storage_on_same_line() {
        let source = "for (uint i = 0; i < items.length; i++) { items.push(i); }";

        let scan = scan_gas_patterns(source);
        assert_eq!(
            scan.inefficiencies,
            vec![
                "Line 1: Inefficient loop with .length access",
                "Line 1: Frequent storage access detected",
            ]
        );
        assert_eq!(scan.optimizations.len(), 2);
    }

    #[test]
    fn test_repeated_matches_are_kept() {
        let source = "delete a;\ndelete b;";
        let scan = scan_gas_patterns(source);
        assert_eq!(scan.inefficiencies.len(), 2);
        assert_eq!(
            scan.optimizations,
            vec![
                "Use memory variables to reduce storage reads",
                "Use memory variables to reduce storage reads",
            ]
        );
    }

    #[test]
    fn test_pricing() {
        let analysis = scan_gas_patterns("uint256 x;").priced(25_000_000_000);
        assert_eq!(analysis.gas_price, "25.0");
        // 21_000 * 25 gwei
        assert_eq!(analysis.total_cost, "0.000525");
    }

    #[test]
    fn test_zero_gas_price_falls_back_for_total() {
        let analysis = scan_gas_patterns("uint256 x;").priced(0);
        assert_eq!(analysis.gas_price, "0.0");
        assert_eq!(analysis.total_cost, "0.000525");
    }
}
