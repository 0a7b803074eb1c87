//! Plugin contract.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::cache::CacheError;
use crate::domain::{RequestContext, ResponseCompleteContext};
use crate::ports::RepositoryError;

/// Response produced by a plugin instead of the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortCircuitResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ShortCircuitResponse {
    /// JSON response with the given status.
    pub fn json(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What a request hook decided. Exactly one per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOutcome {
    Continue,
    ShortCircuit(ShortCircuitResponse),
    Blocked { reason: String },
    /// Replacement request body, visible to every later plugin and upstream.
    ModifiedBody(String),
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] RepositoryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Hook timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Hook panicked: {0}")]
    Panicked(String),
}

/// A request/response hook set.
///
/// Both hooks default to doing nothing, so a plugin implements only the
/// phase it cares about.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs first. Ties keep registration order.
    fn priority(&self) -> i32;

    async fn on_request(&self, _ctx: &RequestContext) -> Result<PluginOutcome, PluginError> {
        Ok(PluginOutcome::Continue)
    }

    /// Side effects only; cannot alter the response already sent.
    async fn on_response_complete(
        &self,
        _ctx: &ResponseCompleteContext,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}
