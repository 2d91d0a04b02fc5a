//! Engine configuration.
//!
//! Defaults resolve from the environment (dotenv-aware) so deployments can
//! tune the core without code changes.

use std::time::Duration;

use crate::event_bus::{EventBus, EventSink, MemorySink, StdOutSink};
use crate::store::BoardStore;

/// Top-level configuration for an [`Engine`](crate::engine::Engine).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How long a writer may wait on a board's exclusive lock before the
    /// store reports a timeout.
    pub lock_timeout: Duration,
    pub event_bus: EventBusConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Self::resolve_lock_timeout(None),
            event_bus: EventBusConfig::default(),
        }
    }
}

impl EngineConfig {
    fn resolve_lock_timeout(provided: Option<Duration>) -> Duration {
        if let Some(timeout) = provided {
            return timeout;
        }
        dotenvy::dotenv().ok();
        std::env::var("BOARDFLOW_LOCK_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(BoardStore::DEFAULT_LOCK_TIMEOUT)
    }

    pub fn new(lock_timeout: Option<Duration>) -> Self {
        Self {
            lock_timeout: Self::resolve_lock_timeout(lock_timeout),
            event_bus: EventBusConfig::default(),
        }
    }

    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBusConfig) -> Self {
        self.event_bus = event_bus;
        self
    }

    #[must_use]
    pub fn with_memory_event_bus(self) -> Self {
        self.with_event_bus(EventBusConfig::with_memory_sink())
    }
}

/// Sink selection for the configured event bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkConfig {
    StdOut,
    Memory,
}

/// Declarative event-bus setup, turned into a live bus at engine build time.
#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub sinks: Vec<SinkConfig>,
}

impl EventBusConfig {
    #[must_use]
    pub fn new(sinks: Vec<SinkConfig>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self::new(vec![SinkConfig::StdOut])
    }

    #[must_use]
    pub fn with_memory_sink() -> Self {
        Self::new(vec![SinkConfig::StdOut, SinkConfig::Memory])
    }

    #[must_use]
    pub fn add_sink(mut self, sink: SinkConfig) -> Self {
        if !self.sinks.contains(&sink) {
            self.sinks.push(sink);
        }
        self
    }

    /// Build the live bus this configuration describes.
    pub fn build_event_bus(&self) -> EventBus {
        let sinks: Vec<Box<dyn EventSink>> = self
            .sinks
            .iter()
            .map(|sink| match sink {
                SinkConfig::StdOut => Box::new(StdOutSink::default()) as Box<dyn EventSink>,
                SinkConfig::Memory => Box::new(MemorySink::new()) as Box<dyn EventSink>,
            })
            .collect();
        EventBus::with_sinks(sinks)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}
