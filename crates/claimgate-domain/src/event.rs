//! Progress events
//!
//! Every stage reports progress as discrete events pushed into a
//! [`ProgressSink`]. Sinks are observers only: dropping every event must not
//! change the result of a run.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Kind of progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Phase or step status
    Status,
    /// A collaborator is being called
    ToolCall,
    /// A collaborator returned
    ToolResult,
    /// A model response
    Response,
    /// A recovered or fatal failure
    Error,
}

/// Pipeline component that emitted an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Phase sequencing
    Orchestrator,
    /// Question normalization
    Normalizer,
    /// Claim mining
    Miner,
    /// Evidence planning
    Planner,
    /// Targeted retrieval
    Retriever,
    /// Evidence rating
    Rater,
    /// Evidence gate
    Gate,
    /// Article writing
    Writer,
    /// Editorial review
    Reviewer,
    /// Follow-up retrieval for gap claims
    GapResearch,
    /// Final bibliography
    Bibliography,
}

impl Component {
    /// Get the component name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Orchestrator => "orchestrator",
            Component::Normalizer => "normalizer",
            Component::Miner => "miner",
            Component::Planner => "planner",
            Component::Retriever => "retriever",
            Component::Rater => "rater",
            Component::Gate => "gate",
            Component::Writer => "writer",
            Component::Reviewer => "reviewer",
            Component::GapResearch => "gap_research",
            Component::Bibliography => "bibliography",
        }
    }
}

/// A single progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Event kind
    pub kind: EventKind,

    /// Emitting component
    pub component: Component,

    /// Human-readable message
    pub message: String,

    /// Structured detail, `null` when absent
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ProgressEvent {
    /// Create an event without payload
    pub fn new(kind: EventKind, component: Component, message: impl Into<String>) -> Self {
        Self {
            kind,
            component,
            message: message.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Status event
    pub fn status(component: Component, message: impl Into<String>) -> Self {
        Self::new(EventKind::Status, component, message)
    }

    /// Error event
    pub fn error(component: Component, message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, component, message)
    }

    /// Attach a structured payload
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    /// Deliver one event; must not fail
    fn emit(&self, event: ProgressEvent);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events of one kind
    pub fn of_kind(&self, kind: EventKind) -> Vec<ProgressEvent> {
        self.events().into_iter().filter(|e| e.kind == kind).collect()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
    fn emit(&self, event: ProgressEvent) {
        (**self).emit(event)
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for std::sync::Arc<S> {
    fn emit(&self, event: ProgressEvent) {
        (**self).emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.emit(ProgressEvent::status(Component::Miner, "one"));
        sink.emit(
            ProgressEvent::error(Component::Retriever, "two")
                .with_payload(serde_json::json!({"query": "q"})),
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "one");
        assert_eq!(events[1].payload["query"], "q");
        assert_eq!(sink.of_kind(EventKind::Error).len(), 1);
    }

    #[test]
    fn test_event_serializes_snake_case() {
        let event = ProgressEvent::new(EventKind::ToolCall, Component::GapResearch, "x");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "tool_call");
        assert_eq!(json["component"], "gap_research");
    }
}
