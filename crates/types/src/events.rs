use serde::{Deserialize, Serialize};

/// Observable progress of a run, streamed to whoever is watching (a monitor
/// UI, a log file, a test).
///
/// Sinks receive every event in order; a sink failure never interrupts the
/// loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A run began for the given case.
    Started { case_id: String },
    /// The foreground screen was captured.
    ScreenCaptured {
        package_name: String,
        element_count: usize,
    },
    /// The model is being consulted.
    ThinkingStarted,
    /// The model chose an action.
    DecisionMade { action: String, reasoning: String },
    /// The policy requires a human sign-off.
    ApprovalNeeded { reason: String },
    /// The policy refused an action.
    ActionBlocked { reason: String },
    /// An action was dispatched to the engine.
    ActionExecuted { description: String, ok: bool },
    /// The model asked for a human.
    HumanReviewRequested {
        reason: String,
        input_prompt: Option<String>,
    },
    /// The case was resolved.
    Resolved { summary: String },
    /// A recoverable error occurred (the loop continues).
    Error { message: String },
    /// The run failed.
    Failed { reason: String },
    /// The run was cancelled externally.
    Cancelled,
}
