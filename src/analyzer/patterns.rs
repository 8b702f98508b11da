//! Textual patterns the security and gas scanners match line by line.
//!
//! These are heuristics over raw source text, not an AST analysis: they
//! over-report (comments, strings) and under-report (anything spelled
//! differently). Every pattern keeps its source string so issues can name
//! the rule that fired.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

#[derive(Debug)]
pub struct Pattern {
    pub source: &'static str,
    regex: Regex,
}

impl Pattern {
    #[allow(clippy::unwrap_used)] // Static regex pattern is hardcoded and valid
    fn new(source: &'static str, ignore_case: bool) -> Self {
        let regex = RegexBuilder::new(source)
            .case_insensitive(ignore_case)
            .build()
            .unwrap();
        Self { source, regex }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

fn any_case(sources: &[&'static str]) -> Vec<Pattern> {
    sources.iter().map(|s| Pattern::new(s, true)).collect()
}

pub static REENTRANCY: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    any_case(&[
        r"\.call\.value\(",
        r"\.call\(",
        r"external.*payable",
        r"msg\.sender\.call",
    ])
});

pub static INTEGER_OVERFLOW: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        Pattern::new(r"\+\+", false),
        Pattern::new(r"\+\s*=", false),
        Pattern::new(r"\*\s*=", false),
        Pattern::new(r"unchecked", true),
    ]
});

pub static AUTHORIZATION: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    any_case(&[
        r"onlyOwner",
        r"require\(.*msg\.sender",
        r"modifier.*only",
        r"access.*control",
    ])
});

pub static TIMESTAMP_DEPENDENCE: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    any_case(&[r"block\.timestamp", r"block\.number", r"now\s"])
});

pub static DELEGATECALL: LazyLock<Vec<Pattern>> =
    LazyLock::new(|| any_case(&[r"delegatecall", r"assembly.*delegatecall"]));

pub static INEFFICIENT_LOOPS: LazyLock<Vec<Pattern>> =
    LazyLock::new(|| any_case(&[r"for\s*\(.*\.length", r"while.*\.length"]));

pub static STORAGE_ACCESS: LazyLock<Vec<Pattern>> =
    LazyLock::new(|| any_case(&[r"storage\s+", r"\.push\(", r"delete\s+"]));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_sensitivity_follows_pattern_set() {
        assert!(REENTRANCY[2].is_match("function f() EXTERNAL PAYABLE"));
        assert!(AUTHORIZATION[0].is_match("ONLYOWNER"));
        assert!(INTEGER_OVERFLOW[3].is_match("UNCHECKED { i++; }"));
    }

    #[test]
    fn test_patterns_stay_on_one_line() {
        // `.` never crosses a newline, so file-wide checks behave like line checks
        assert!(!AUTHORIZATION[1].is_match("require(ok);\nmsg.sender"));
        assert!(AUTHORIZATION[1].is_match("require(owner == msg.sender);"));
    }
}
