//! Execution observability: structured events, a bus, and pluggable sinks.
//!
//! The dispatcher emits one [`Event`] per lifecycle transition (started,
//! completed, failed, blocked, cancel requested). The [`EventBus`] receives
//! them over a flume channel and broadcasts to every registered
//! [`EventSink`] from a background listener task.

mod bus;
mod event;
mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, ExecutionEvent, ExecutionPhase};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
