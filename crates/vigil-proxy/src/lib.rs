#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod bootstrap;
pub mod error;
pub mod forward;
pub mod server;
pub mod sse;
pub mod state;
pub mod stream_tap;

pub use bootstrap::{GatewayContext, ServerConfig, assemble, bootstrap};
pub use error::GatewayError;
pub use server::{REQUEST_ID_HEADER, create_router, serve};
pub use sse::EventBroadcaster;
pub use state::AppState;
