//! Shannon entropy pre-filter for free-form secrets.

use std::collections::HashMap;

/// Shannon entropy of `value` in bits per character.
///
/// Empty input has zero entropy.
pub fn shannon_entropy(value: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in value.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = total as f64;
    counts
        .values()
        .map(|&n| {
            #[allow(clippy::cast_precision_loss)]
            let p = n as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Length and entropy bounds a candidate token must meet to count as a
/// likely secret.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyGate {
    /// Minimum bits per character (inclusive).
    pub threshold: f64,
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for EntropyGate {
    fn default() -> Self {
        Self {
            threshold: 3.5,
            min_len: 20,
            max_len: 128,
        }
    }
}

impl EntropyGate {
    pub fn admits(&self, token: &str) -> bool {
        let len = token.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        shannon_entropy(token) >= self.threshold
    }
}
