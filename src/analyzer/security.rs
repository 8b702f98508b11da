use serde::Serialize;

use super::patterns::{
    Pattern, AUTHORIZATION, DELEGATECALL, INTEGER_OVERFLOW, REENTRANCY, TIMESTAMP_DEPENDENCE,
};
use crate::severity::Severity;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SecurityIssue {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// A line-scoped vulnerability category.
struct LineCheck {
    severity: Severity,
    title: &'static str,
    description: &'static str,
    suggestion: &'static str,
    patterns: &'static [Pattern],
}

impl LineCheck {
    fn issue(&self, line: usize, pattern: &Pattern) -> SecurityIssue {
        SecurityIssue {
            severity: self.severity,
            title: self.title.to_string(),
            description: self.description.to_string(),
            line: Some(line),
            suggestion: Some(self.suggestion.to_string()),
            pattern: Some(pattern.source.to_string()),
        }
    }
}

fn line_checks() -> [LineCheck; 4] {
    [
        LineCheck {
            severity: Severity::Critical,
            title: "Potential Reentrancy Vulnerability",
            description: "External call detected without proper reentrancy protection",
            suggestion: "Use ReentrancyGuard or Checks-Effects-Interactions pattern",
            patterns: &REENTRANCY,
        },
        LineCheck {
            severity: Severity::Medium,
            title: "Potential Integer Overflow",
            description: "Arithmetic operation without overflow protection",
            suggestion: "Use SafeMath library or Solidity 0.8+ built-in checks",
            patterns: &INTEGER_OVERFLOW,
        },
        LineCheck {
            severity: Severity::Low,
            title: "Timestamp Dependence",
            description: "Contract logic depends on block timestamp",
            suggestion: "Avoid using block.timestamp for critical logic",
            patterns: &TIMESTAMP_DEPENDENCE,
        },
        LineCheck {
            severity: Severity::High,
            title: "Dangerous Delegatecall",
            description: "Delegatecall can be dangerous if not properly controlled",
            suggestion: "Ensure delegatecall target is trusted and validated",
            patterns: &DELEGATECALL,
        },
    ]
}

fn missing_access_control() -> SecurityIssue {
    SecurityIssue {
        severity: Severity::Medium,
        title: "Missing Access Control".to_string(),
        description: "Contract may lack proper access control mechanisms".to_string(),
        line: None,
        suggestion: Some("Implement proper role-based access control".to_string()),
        pattern: None,
    }
}

/// Scans `source` line by line. Every (line, pattern) match yields one
/// issue, in scan order; nothing is de-duplicated. The access control check
/// is file-scoped and adds at most one issue.
pub fn analyze_contract_security(source: &str) -> Vec<SecurityIssue> {
    let checks = line_checks();
    let mut issues = Vec::new();

    for (index, line) in source.split('\n').enumerate() {
        for check in &checks {
            for pattern in check.patterns {
                if pattern.is_match(line) {
                    issues.push(check.issue(index + 1, pattern));
                }
            }
        }
    }

    let has_access_control = AUTHORIZATION.iter().any(|p| p.is_match(source));
    if !has_access_control {
        issues.push(missing_access_control());
    }

    issues
}
