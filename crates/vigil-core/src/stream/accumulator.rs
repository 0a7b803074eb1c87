//! Folds stream events into usage and text for response-phase plugins.

use std::sync::Arc;

use serde_json::Value;

use super::{DONE_MARKER, StreamEvent};
use crate::domain::Usage;
use crate::providers::ProviderAdapter;

/// What a finished stream amounted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub usage: Usage,
    pub text: String,
    /// Frames seen, including ones with nothing extractable.
    pub event_count: usize,
}

#[derive(Debug)]
pub struct StreamAccumulator {
    adapter: Arc<dyn ProviderAdapter>,
    summary: StreamSummary,
}

impl StreamAccumulator {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            adapter,
            summary: StreamSummary::default(),
        }
    }

    /// Fold one event in. The done marker and non-JSON payloads are counted
    /// but otherwise ignored.
    pub fn push(&mut self, event: &StreamEvent) {
        self.summary.event_count += 1;

        let data = event.data.trim();
        if data.is_empty() || data == DONE_MARKER {
            return;
        }
        let Ok(value) = serde_json::from_str::<Value>(data) else {
            return;
        };

        let usage = self.adapter.extract_usage(Some(&value));
        self.summary.usage.merge(&usage);
        if let Some(text) = self.adapter.extract_stream_text(&value) {
            self.summary.text.push_str(&text);
        }
    }

    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a StreamEvent>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn finish(self) -> StreamSummary {
        self.summary
    }
}
