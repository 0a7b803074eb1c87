//! Built-in detection pattern catalogue.

use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

use super::Validator;
use crate::domain::PatternCategory;

/// One named detector.
#[derive(Debug)]
pub struct DetectionPattern {
    pub name: &'static str,
    pub category: PatternCategory,
    /// When the regex has a capture group, group 1 is the sensitive value
    /// and the only part that gets redacted.
    pub regex: Regex,
    pub description: &'static str,
    pub validator: Option<Validator>,
    /// At least one must appear near the match (context-aware patterns only).
    pub context_keywords: &'static [&'static str],
    /// `context_keywords` as one case-insensitive, whole-word regex.
    pub context: Option<Regex>,
}

struct PatternDef {
    name: &'static str,
    category: PatternCategory,
    regex: &'static str,
    description: &'static str,
    validator: Option<Validator>,
    context_keywords: &'static [&'static str],
}

const PATTERN_TABLE: &[PatternDef] = &[
    PatternDef {
        name: "aws_access_key",
        category: PatternCategory::HighConfidence,
        regex: r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
        description: "AWS access key ID",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "github_token",
        category: PatternCategory::HighConfidence,
        regex: r"\b(?:gh[pousr]_[A-Za-z0-9]{36,255}|github_pat_[A-Za-z0-9_]{22,255})\b",
        description: "GitHub personal access or app token",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "anthropic_api_key",
        category: PatternCategory::HighConfidence,
        regex: r"\bsk-ant-[A-Za-z0-9_\-]{20,}",
        description: "Anthropic API key",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "openai_api_key",
        category: PatternCategory::HighConfidence,
        regex: r"\bsk-(?:proj-|svcacct-)?[A-Za-z0-9]{20}[A-Za-z0-9_\-]*",
        description: "OpenAI API key",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "slack_token",
        category: PatternCategory::HighConfidence,
        regex: r"\bxox[abprs]-[A-Za-z0-9\-]{10,}",
        description: "Slack bot/user token",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "stripe_key",
        category: PatternCategory::HighConfidence,
        regex: r"\b(?:sk|rk)_(?:live|test)_[A-Za-z0-9]{16,}",
        description: "Stripe secret or restricted key",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "private_key",
        category: PatternCategory::HighConfidence,
        regex: r"(?s)-----BEGIN [A-Z ]*PRIVATE KEY-----.*?-----END [A-Z ]*PRIVATE KEY-----",
        description: "PEM private key block",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "google_api_key",
        category: PatternCategory::HighConfidence,
        regex: r"\bAIza[0-9A-Za-z_\-]{35}",
        description: "Google API key",
        validator: None,
        context_keywords: &[],
    },
    PatternDef {
        name: "generic_secret",
        category: PatternCategory::HighConfidence,
        regex: r#"(?i)\b(?:api[_-]?key|secret|token|password|passwd|credential)s?["']?\s*[:=]\s*["']?([A-Za-z0-9_\-+/=.]{16,})"#,
        description: "High-entropy value assigned to a secret-like name",
        validator: Some(Validator::Entropy),
        context_keywords: &[],
    },
    PatternDef {
        name: "credit_card",
        category: PatternCategory::Validated,
        regex: r"\b(?:\d[ \-]?){12,18}\d\b",
        description: "Payment card number (Luhn-checked)",
        validator: Some(Validator::Luhn),
        context_keywords: &[],
    },
    PatternDef {
        name: "us_ssn",
        category: PatternCategory::Validated,
        regex: r"\b\d{3}-\d{2}-\d{4}\b",
        description: "US social security number",
        validator: Some(Validator::Ssn),
        context_keywords: &[],
    },
    PatternDef {
        name: "email",
        category: PatternCategory::ContextAware,
        regex: r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b",
        description: "Email address",
        validator: None,
        context_keywords: &["email", "e-mail", "mail", "contact", "reach", "send to"],
    },
    PatternDef {
        name: "phone_number",
        category: PatternCategory::ContextAware,
        regex: r"(?:\+?1[ .\-]?)?\(?\b\d{3}\)?[ .\-]\d{3}[ .\-]\d{4}\b",
        description: "North American phone number",
        validator: None,
        context_keywords: &["phone", "call", "tel", "mobile", "cell", "contact", "text me"],
    },
    PatternDef {
        name: "ipv4_address",
        category: PatternCategory::ContextAware,
        regex: r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b",
        description: "IPv4 address",
        validator: None,
        context_keywords: &["ip", "address", "server", "host", "internal", "vpn"],
    },
];

/// All built-in patterns, compiled once.
///
/// Ordered by category (high-confidence, validated, context-aware); earlier
/// patterns win when two matches overlap at the same offset.
pub static PATTERNS: LazyLock<Vec<DetectionPattern>> = LazyLock::new(|| {
    PATTERN_TABLE
        .iter()
        .filter_map(|def| match compile(def) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                error!(pattern = def.name, error = %e, "Detection pattern failed to compile");
                None
            }
        })
        .collect()
});

fn compile(def: &PatternDef) -> Result<DetectionPattern, regex::Error> {
    Ok(DetectionPattern {
        name: def.name,
        category: def.category,
        regex: Regex::new(def.regex)?,
        description: def.description,
        validator: def.validator,
        context_keywords: def.context_keywords,
        context: keyword_regex(def.context_keywords)?,
    })
}

/// `(?i)\b(?:kw1|kw2|...)\b`, or `None` for an empty list.
fn keyword_regex(keywords: &[&str]) -> Result<Option<Regex>, regex::Error> {
    if keywords.is_empty() {
        return Ok(None);
    }
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pattern_compiles() {
        assert_eq!(PATTERNS.len(), PATTERN_TABLE.len());
    }

    #[test]
    fn test_pattern_names_are_unique() {
        let mut names: Vec<_> = PATTERNS.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PATTERNS.len());
    }

    #[test]
    fn test_only_context_aware_patterns_have_keywords() {
        for pattern in PATTERNS.iter() {
            assert_eq!(
                pattern.category == PatternCategory::ContextAware,
                !pattern.context_keywords.is_empty(),
                "{}",
                pattern.name
            );
        }
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        let ip = PATTERNS.iter().find(|p| p.name == "ipv4_address").unwrap();
        let context = ip.context.as_ref().unwrap();
        assert!(context.is_match("the IP is"));
        assert!(context.is_match("vpn:"));
        assert!(!context.is_match("shipped a recipe description"));

        let phone = PATTERNS.iter().find(|p| p.name == "phone_number").unwrap();
        assert!(!phone.context.as_ref().unwrap().is_match("hotel recall cellar"));
    }

    #[test]
    fn test_openai_pattern_skips_anthropic_keys() {
        let openai = PATTERNS.iter().find(|p| p.name == "openai_api_key").unwrap();
        assert!(!openai.regex.is_match("sk-ant-REDACTED"));
        assert!(openai.regex.is_match("sk-proj-abcdefghijklmnopqrst1234"));
    }
}
