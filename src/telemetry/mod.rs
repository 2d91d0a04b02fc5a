//! Event rendering used by output sinks.
//!
//! Formatters turn an [`Event`] into display lines; sinks decide where the
//! lines go. Keeping the two apart lets one formatter feed stdout, files,
//! and test capture alike.

use crate::event_bus::Event;

/// Install a global tracing subscriber with env-filter, fmt output, and
/// span-trace capture. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}

/// One rendered event, possibly spanning multiple lines.
#[derive(Clone, Debug, Default)]
pub struct RenderedEvent {
    lines: Vec<String>,
}

impl RenderedEvent {
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Join into a newline-terminated block ready for a writer.
    pub fn join_lines(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Renders events for a sink.
pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &Event) -> RenderedEvent;
}

/// Single-line plain-text rendering; the default for stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainFormatter;

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> RenderedEvent {
        RenderedEvent::from_lines(vec![event.to_string()])
    }
}

/// Compact JSON rendering, one object per line.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter;

impl TelemetryFormatter for JsonFormatter {
    fn render_event(&self, event: &Event) -> RenderedEvent {
        let line = event
            .to_json_string()
            .unwrap_or_else(|_| event.to_string());
        RenderedEvent::from_lines(vec![line])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_formatter_renders_one_line() {
        let rendered = PlainFormatter.render_event(&Event::diagnostic("scope", "msg"));
        assert_eq!(rendered.lines(), &["[scope] msg".to_string()]);
        assert_eq!(rendered.join_lines(), "[scope] msg\n");
    }

    #[test]
    fn json_formatter_emits_parseable_lines() {
        let rendered = JsonFormatter.render_event(&Event::diagnostic("scope", "msg"));
        let parsed: serde_json::Value = serde_json::from_str(&rendered.lines()[0]).unwrap();
        assert_eq!(parsed["type"], "diagnostic");
    }
}
