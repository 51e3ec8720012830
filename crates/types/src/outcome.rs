use serde::{Deserialize, Serialize};

/// Verdict of the safety policy for one proposed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyDecision {
    /// Execute without further ceremony.
    Allowed,
    /// Pause the run and hand the decision to a human.
    NeedsApproval { reason: String },
    /// Refuse the action outright.
    Blocked { reason: String },
}

/// What actually happened when an action was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failed { reason: String },
    /// The action itself declared the case resolved.
    Resolved { summary: String },
    /// The action itself requested a human.
    HumanReviewNeeded {
        reason: String,
        input_prompt: Option<String>,
    },
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentResult {
    Resolved { summary: String, iterations: u32 },
    Failed { reason: String },
    NeedsHumanReview { reason: String, iterations: u32 },
    Cancelled,
}
