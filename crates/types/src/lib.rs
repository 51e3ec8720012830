//! Core data model for the Redress support agent.
//!
//! Everything the agent crates exchange lives here: the case being worked,
//! snapshots of the foreground screen, the actions a model may request, the
//! verdicts and outcomes those actions produce, the event stream observers
//! subscribe to, and the error taxonomy.

pub mod action;
pub mod case;
pub mod error;
pub mod events;
pub mod outcome;
pub mod screen;

pub use action::{AgentAction, AgentDecision};
pub use case::CaseContext;
pub use error::{DecisionError, ErrorCode};
pub use events::AgentEvent;
pub use outcome::{ActionOutcome, AgentResult, PolicyDecision};
pub use screen::{Bounds, ScreenFingerprint, ScreenState, UiElement};
