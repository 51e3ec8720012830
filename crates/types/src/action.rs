use serde::{Deserialize, Serialize};

/// The one thing the model may emit per iteration: a single tagged action.
///
/// Policy validation, dispatch, and logging all match exhaustively on this
/// enum, so adding a variant forces every consumer to decide what to do
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentAction {
    /// Type a message into the first input field and try to send it.
    TypeMessage { text: String },
    /// Click the element with the given label, or the n-th clickable.
    ClickElement {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        index: Option<usize>,
        /// What the model expects the click to achieve; used by the policy
        /// when no label is available.
        #[serde(default)]
        expected_outcome: Option<String>,
    },
    /// Scroll the first scrollable container forward (down).
    ScrollForward { reason: String },
    /// Scroll the first scrollable container backward (up).
    ScrollBackward { reason: String },
    /// Wait for the screen to change on its own.
    Wait { reason: String },
    /// Attach a file through the app's upload affordance.
    UploadFile { description: String },
    /// Navigate back.
    PressBack { reason: String },
    /// Hand the case to a human; terminal.
    RequestHumanReview {
        reason: String,
        #[serde(default)]
        input_prompt: Option<String>,
    },
    /// Declare the case resolved; terminal.
    MarkResolved { summary: String },
}

impl AgentAction {
    /// Tool name used on the decision-channel wire.
    pub const fn tool_name(&self) -> &'static str {
        match self {
            Self::TypeMessage { .. } => "type_message",
            Self::ClickElement { .. } => "click_element",
            Self::ScrollForward { .. } => "scroll_forward",
            Self::ScrollBackward { .. } => "scroll_backward",
            Self::Wait { .. } => "wait",
            Self::UploadFile { .. } => "upload_file",
            Self::PressBack { .. } => "press_back",
            Self::RequestHumanReview { .. } => "request_human_review",
            Self::MarkResolved { .. } => "mark_resolved",
        }
    }

    /// Human-readable description, also the textual signature the loop uses
    /// for history entries and duplicate detection.
    pub fn describe(&self) -> String {
        match self {
            Self::TypeMessage { text } => format!("Type message: \"{}\"", text),
            Self::ClickElement { label: Some(label), .. } => {
                format!("Click element: \"{}\"", label)
            }
            Self::ClickElement { index: Some(index), .. } => {
                format!("Click element #{}", index)
            }
            Self::ClickElement { .. } => "Click element".to_string(),
            Self::ScrollForward { .. } => "Scroll forward".to_string(),
            Self::ScrollBackward { .. } => "Scroll backward".to_string(),
            Self::Wait { .. } => "Wait".to_string(),
            Self::UploadFile { description } => format!("Upload file: \"{}\"", description),
            Self::PressBack { .. } => "Press back".to_string(),
            Self::RequestHumanReview { reason, .. } => {
                format!("Request human review: {}", reason)
            }
            Self::MarkResolved { summary } => format!("Mark resolved: {}", summary),
        }
    }

    /// Whether the action ends the run by itself.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::RequestHumanReview { .. } | Self::MarkResolved { .. })
    }
}

/// A model decision: the chosen action plus the model's stated reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDecision {
    pub action: AgentAction,
    pub reasoning: String,
}
