//! Policy configuration, keyword tables, and the sensitive-content
//! regex catalogue.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tunables of the safety policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Hard cap on think-act cycles per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Lower bound on inter-action pacing.
    #[serde(default = "default_min_action_delay_ms")]
    pub min_action_delay_ms: u64,

    /// Promote non-financial approval requests on clicks to allowed.
    /// Financial keywords always require approval.
    #[serde(default)]
    pub auto_approve_safe_actions: bool,
}

fn default_max_iterations() -> u32 {
    30
}

fn default_min_action_delay_ms() -> u64 {
    800
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            min_action_delay_ms: default_min_action_delay_ms(),
            auto_approve_safe_actions: false,
        }
    }
}

/// Click labels that spend the user's money.
pub(crate) const FINANCIAL_KEYWORDS: &[&str] = &[
    "pay",
    "purchase",
    "subscribe",
    "buy",
    "checkout",
    "place order",
    "confirm payment",
    "add to cart",
    "complete purchase",
    "authorize",
];

/// Click labels that destroy something hard to get back.
pub(crate) const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "delete account",
    "close account",
    "cancel subscription",
    "terminate",
    "deactivate",
];

/// US social security numbers, dashed or bare.
pub(crate) static SSN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b|\b\d{9}\b").expect("ssn pattern"));

/// 13-19 digit runs with optional space/dash grouping; candidates only,
/// the Luhn checksum has the final word.
pub(crate) static CARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){12,18}\d\b").expect("card pattern"));

/// `password: hunter2` and friends.
pub(crate) static PASSWORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(password|passwd|pwd)\s*[:=]\s*\S+").expect("password pattern"));

/// Injection guard: no legitimate support message needs this much text.
pub(crate) const MAX_MESSAGE_CHARS: usize = 2000;

/// Luhn checksum over a digit string: right to left, double every second
/// digit (minus 9 when above 9), sum divisible by 10.
pub(crate) fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    let mut double = false;
    for ch in digits.chars().rev() {
        let Some(d) = ch.to_digit(10) else {
            return false;
        };
        let mut d = d;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    !digits.is_empty() && sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straightforward reference implementation to cross-check against.
    fn luhn_reference(digits: &str) -> bool {
        let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
        if values.len() != digits.len() || values.is_empty() {
            return false;
        }
        let total: u32 = values
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &d)| {
                if i % 2 == 1 {
                    let doubled = d * 2;
                    if doubled > 9 {
                        doubled - 9
                    } else {
                        doubled
                    }
                } else {
                    d
                }
            })
            .sum();
        total % 10 == 0
    }

    #[test]
    fn luhn_agrees_with_reference() {
        let samples = [
            "4532015112830366",
            "4532015112830367",
            "4111111111111111",
            "1234567812345670",
            "79927398713",
            "378282246310005",
            "6011111111111117",
            "0000000000000",
            "9999999999999999999",
        ];
        for s in samples {
            assert_eq!(luhn_valid(s), luhn_reference(s), "disagreement on {}", s);
        }
    }

    #[test]
    fn card_pattern_matches_grouped_numbers() {
        assert!(CARD_PATTERN.is_match("4532 0151 1283 0366"));
        assert!(CARD_PATTERN.is_match("4532-0151-1283-0366"));
        assert!(CARD_PATTERN.is_match("4532015112830366"));
        assert!(!CARD_PATTERN.is_match("order 123456"));
    }

    #[test]
    fn ssn_pattern_variants() {
        assert!(SSN_PATTERN.is_match("my ssn is 123-45-6789"));
        assert!(SSN_PATTERN.is_match("123456789"));
        assert!(!SSN_PATTERN.is_match("12-345-678"));
    }

    #[test]
    fn config_defaults() {
        let config: PolicyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_iterations, 30);
        assert_eq!(config.min_action_delay_ms, 800);
        assert!(!config.auto_approve_safe_actions);
    }
}
