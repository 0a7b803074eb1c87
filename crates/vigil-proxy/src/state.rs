//! Shared application state type.

use std::sync::Arc;

use crate::bootstrap::GatewayContext;

/// State shared by every handler.
pub type AppState = Arc<GatewayContext>;
