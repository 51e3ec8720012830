//! The Redress agent core: observe, think, act.
//!
//! A [`runner::CaseAgent`] drives a third-party app on behalf of a user
//! until the case is resolved, fails, needs a human, or is cancelled. Each
//! iteration captures the screen through the accessibility engine, renders
//! it for the model ([`format`]), asks the decision channel for exactly one
//! action ([`channel`]), validates it ([`policy`]), executes it
//! ([`dispatch`]), and paces itself on screen settling.

pub mod channel;
pub mod dispatch;
pub mod format;
pub mod policy;
pub mod prompt;
pub mod runner;

pub use channel::DecisionChannel;
pub use dispatch::ActionExecutor;
pub use policy::{PolicyConfig, SafetyPolicy};
pub use runner::{AgentController, AgentPhase, CaseAgent};
