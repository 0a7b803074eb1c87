//! Server-sent-event interception.
//!
//! The proxy forwards upstream bytes to the client untouched and copies
//! each chunk onto a side channel. [`SseParser`] turns those copies into
//! [`StreamEvent`]s and [`StreamAccumulator`] folds them into a
//! [`StreamSummary`] for the response-phase plugins.

mod accumulator;
mod sse;

pub use accumulator::{StreamAccumulator, StreamSummary};
pub use sse::{SseParser, StreamEvent};

/// Data payload that marks the end of an OpenAI-style stream.
pub const DONE_MARKER: &str = "[DONE]";
