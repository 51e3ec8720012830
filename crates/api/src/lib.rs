//! Boundary traits the Redress core consumes, plus the adapters and mocks
//! that implement them.
//!
//! The host supplies an [`host::AccessibilityHost`] (the platform UI
//! surface), a [`llm::DecisionTransport`] (the model), an [`sink::EventSink`]
//! (the observer), and optionally a [`launcher::AppLauncher`]. The core never
//! talks to the platform or the network through anything else.

pub mod host;
pub mod launcher;
pub mod llm;
pub mod sink;

pub use host::{AccessibilityHost, GestureStroke, GlobalAction, NodeAction, UiNode};
pub use launcher::AppLauncher;
pub use llm::{DecisionRequest, DecisionTransport, ToolDefinition, ToolInvocation};
pub use sink::{BroadcastSink, CollectingSink, EventSink, NullSink};
