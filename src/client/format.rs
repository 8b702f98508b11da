//! Display helpers shared by the CLI and the dashboard.

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};

/// Accepts `0x`-prefixed or bare 40-digit hex. Mixed-case input must carry
/// a valid EIP-55 checksum; all-lower and all-upper input is not checked.
pub fn is_valid_address(input: &str) -> bool {
    let hex = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")).unwrap_or(input);
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{hex}"), None).is_ok();
    }
    true
}

/// `0x1234...abcd`. Strings shorter than 10 chars are returned unchanged.
pub fn format_address(address: &str, start_chars: usize, end_chars: usize) -> String {
    if address.len() < 10 || start_chars + end_chars >= address.len() {
        return address.to_string();
    }
    format!(
        "{}...{}",
        &address[..start_chars],
        &address[address.len() - end_chars..]
    )
}

pub fn format_number(number: f64, decimals: usize) -> String {
    if number >= 1e9 {
        format!("{:.*}B", decimals, number / 1e9)
    } else if number >= 1e6 {
        format!("{:.*}M", decimals, number / 1e6)
    } else if number >= 1e3 {
        format!("{:.*}K", decimals, number / 1e3)
    } else {
        format!("{:.*}", decimals, number)
    }
}

/// Drops trailing fractional zeros from a fixed-point string, keeping one
/// digit after the point (`"25.000000000"` becomes `"25.0"`).
pub fn trim_units(formatted: String) -> String {
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => formatted,
    }
}

/// Wei to a trimmed gwei string.
pub fn format_gwei(wei: u128) -> String {
    format_units(U256::from(wei), "gwei")
        .map(trim_units)
        .unwrap_or_else(|_| "0.0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        // Checksummed WAVAX
        assert!(is_valid_address("0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7"));
        assert!(is_valid_address("0xb31f66aa3c1e785363f0875a1b74e27b85fd66c7"));
        assert!(is_valid_address("b31f66aa3c1e785363f0875a1b74e27b85fd66c7"));
        // Bad checksum: one letter flipped
        assert!(!is_valid_address("0xb31f66AA3C1e785363F0875A1B74E27b85FD66c7"));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address("0xZZ1f66aa3c1e785363f0875a1b74e27b85fd66c7"));
    }

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7", 6, 4),
            "0xB31f...66c7"
        );
        assert_eq!(format_address("0x1234", 6, 4), "0x1234");
    }

    #[test]
    fn test_format_number_suffixes() {
        assert_eq!(format_number(11_234_567_890.0, 2), "11.23B");
        assert_eq!(format_number(345_678_901.0, 1), "345.7M");
        assert_eq!(format_number(1_500.0, 2), "1.50K");
        assert_eq!(format_number(28.5, 2), "28.50");
    }

    #[test]
    fn test_trim_units() {
        assert_eq!(trim_units("25.000000000".to_string()), "25.0");
        assert_eq!(trim_units("0.000525000000000000".to_string()), "0.000525");
        assert_eq!(trim_units("42".to_string()), "42");
    }

    #[test]
    fn test_format_gwei() {
        assert_eq!(format_gwei(25_000_000_000), "25.0");
        assert_eq!(format_gwei(1_500_000_000), "1.5");
    }
}
