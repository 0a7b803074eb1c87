//! Chat/bot platform APIs.
//!
//! Messaging traffic is inspected (DLP, audit) but never cached or
//! rewritten, and has no model or token usage.

use super::{ProviderAdapter, ProviderKind};

/// Adapter for one messaging platform. Construct with the named constructors.
#[derive(Debug, Clone, Copy)]
pub struct MessagingAdapter {
    name: &'static str,
    base_url: &'static str,
    auth_header: Option<&'static str>,
    vendor_headers: &'static [&'static str],
}

impl MessagingAdapter {
    /// Telegram Bot API. The bot token travels in the URL path.
    pub const fn telegram() -> Self {
        Self {
            name: "telegram",
            base_url: "https://api.telegram.org",
            auth_header: None,
            vendor_headers: &[],
        }
    }

    pub const fn discord() -> Self {
        Self {
            name: "discord",
            base_url: "https://discord.com/api",
            auth_header: Some("authorization"),
            vendor_headers: &["x-audit-log-reason", "user-agent"],
        }
    }

    pub const fn slack() -> Self {
        Self {
            name: "slack",
            base_url: "https://slack.com/api",
            auth_header: Some("authorization"),
            vendor_headers: &[],
        }
    }

    /// WhatsApp Cloud API (Graph API).
    pub const fn whatsapp() -> Self {
        Self {
            name: "whatsapp",
            base_url: "https://graph.facebook.com",
            auth_header: Some("authorization"),
            vendor_headers: &[],
        }
    }

    /// LINE Messaging API.
    pub const fn line() -> Self {
        Self {
            name: "line",
            base_url: "https://api.line.me",
            auth_header: Some("authorization"),
            vendor_headers: &["x-line-retry-key"],
        }
    }

    pub const fn all() -> [Self; 5] {
        [
            Self::telegram(),
            Self::discord(),
            Self::slack(),
            Self::whatsapp(),
            Self::line(),
        ]
    }
}

impl ProviderAdapter for MessagingAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Messaging
    }

    fn base_url(&self) -> &'static str {
        self.base_url
    }

    fn auth_header(&self) -> Option<&'static str> {
        self.auth_header
    }

    fn vendor_headers(&self) -> &'static [&'static str] {
        self.vendor_headers
    }
}
