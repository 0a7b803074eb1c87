//! Plugin pipeline.
//!
//! Request phase: plugins run one after another in ascending priority. Each
//! may pass, rewrite the body, answer the request itself, or refuse it.
//! Faults are resolved by [`FailMode`](crate::settings::FailMode).
//!
//! Response phase: every plugin's completion hook runs, in the same order,
//! regardless of what the others did.

mod engine;
mod plugin;

use serde::{Deserialize, Serialize};

use crate::domain::RequestContext;

pub use engine::{PipelineConfig, PluginPipeline};
pub use plugin::{Plugin, PluginError, PluginOutcome, ShortCircuitResponse};

/// Which hook a fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    Request,
    Response,
}

/// A hook that errored, panicked or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFault {
    pub plugin: String,
    pub error: String,
}

/// How the request phase ended.
#[derive(Debug)]
pub enum RequestPhaseOutcome {
    /// Forward upstream. `skipped` lists plugins ignored under fail-open.
    Proceed {
        ctx: RequestContext,
        skipped: Vec<PluginFault>,
    },
    /// A plugin produced the response; upstream must not be called.
    ShortCircuit {
        ctx: RequestContext,
        plugin: String,
        response: ShortCircuitResponse,
    },
    /// A plugin refused the request.
    Blocked {
        ctx: RequestContext,
        plugin: String,
        reason: String,
    },
    /// A plugin faulted under fail-closed; upstream must not be called.
    Failed {
        ctx: RequestContext,
        fault: PluginFault,
    },
}

impl RequestPhaseOutcome {
    pub const fn context(&self) -> &RequestContext {
        match self {
            Self::Proceed { ctx, .. }
            | Self::ShortCircuit { ctx, .. }
            | Self::Blocked { ctx, .. }
            | Self::Failed { ctx, .. } => ctx,
        }
    }

    pub const fn proceeds(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }
}
