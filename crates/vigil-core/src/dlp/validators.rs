//! Structural validators that confirm a regex match is real.

use serde::{Deserialize, Serialize};

use super::EntropyGate;

/// Check applied to a raw regex match before it becomes a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    Luhn,
    Ssn,
    /// Length/entropy gate from the engine configuration.
    Entropy,
}

impl Validator {
    pub fn validate(self, value: &str, gate: &EntropyGate) -> bool {
        match self {
            Self::Luhn => luhn_check(value),
            Self::Ssn => ssn_check(value),
            Self::Entropy => gate.admits(value),
        }
    }
}

fn digits(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Luhn checksum over the digits of `value`, 13 to 19 digits long.
pub fn luhn_check(value: &str) -> bool {
    let digits = digits(value);
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// US social security number structure: area, group and serial ranges.
pub fn ssn_check(value: &str) -> bool {
    let digits = digits(value);
    if digits.len() != 9 {
        return false;
    }
    let number = |range: std::ops::Range<usize>| {
        digits[range].iter().fold(0u32, |acc, d| acc * 10 + d)
    };

    let area = number(0..3);
    let group = number(3..5);
    let serial = number(5..9);

    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}
