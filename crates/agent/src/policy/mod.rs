//! The safety policy: every proposed action is classified before execution.

mod rules;

use redress_types::{AgentAction, PolicyDecision};

pub use rules::PolicyConfig;
use rules::{
    luhn_valid, CARD_PATTERN, DESTRUCTIVE_KEYWORDS, FINANCIAL_KEYWORDS, MAX_MESSAGE_CHARS,
    PASSWORD_PATTERN, SSN_PATTERN,
};

/// Classifies proposed actions. `validate` is pure: the same input always
/// yields the same verdict.
#[derive(Debug, Clone, Default)]
pub struct SafetyPolicy {
    config: PolicyConfig,
}

impl SafetyPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Verdict for the action proposed on the given iteration (0-based count
    /// of completed think-act cycles).
    pub fn validate(&self, iteration: u32, action: &AgentAction) -> PolicyDecision {
        if iteration >= self.config.max_iterations {
            return PolicyDecision::Blocked { reason: "max iterations reached".into() };
        }

        match action {
            AgentAction::TypeMessage { text } => self.validate_message(text),
            AgentAction::ClickElement { label, expected_outcome, .. } => {
                self.validate_click(label.as_deref().or(expected_outcome.as_deref()))
            }
            AgentAction::ScrollForward { .. }
            | AgentAction::ScrollBackward { .. }
            | AgentAction::Wait { .. }
            | AgentAction::UploadFile { .. }
            | AgentAction::PressBack { .. }
            | AgentAction::RequestHumanReview { .. }
            | AgentAction::MarkResolved { .. } => PolicyDecision::Allowed,
        }
    }

    /// Outbound text never carries identifiers, card numbers, or secrets.
    fn validate_message(&self, text: &str) -> PolicyDecision {
        if SSN_PATTERN.is_match(text) {
            return PolicyDecision::Blocked {
                reason: "message contains a social security number".into(),
            };
        }

        for candidate in CARD_PATTERN.find_iter(text) {
            let digits: String =
                candidate.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
            if (13..=19).contains(&digits.len()) && luhn_valid(&digits) {
                return PolicyDecision::Blocked {
                    reason: "message contains a payment card number".into(),
                };
            }
        }

        if PASSWORD_PATTERN.is_match(text) {
            return PolicyDecision::NeedsApproval {
                reason: "message appears to contain a password".into(),
            };
        }

        if text.chars().count() > MAX_MESSAGE_CHARS {
            return PolicyDecision::Blocked { reason: "message exceeds the length limit".into() };
        }

        PolicyDecision::Allowed
    }

    /// Clicks on money-moving or account-destroying controls need a human.
    fn validate_click(&self, label: Option<&str>) -> PolicyDecision {
        let Some(label) = label else {
            return PolicyDecision::Allowed;
        };
        let label = label.to_lowercase();

        if let Some(keyword) = FINANCIAL_KEYWORDS.iter().find(|k| label.contains(*k)) {
            return PolicyDecision::NeedsApproval {
                reason: format!("financial action requires approval: \"{}\"", keyword),
            };
        }

        if let Some(keyword) = DESTRUCTIVE_KEYWORDS.iter().find(|k| label.contains(*k)) {
            if self.config.auto_approve_safe_actions {
                return PolicyDecision::Allowed;
            }
            return PolicyDecision::NeedsApproval {
                reason: format!("destructive action requires approval: \"{}\"", keyword),
            };
        }

        PolicyDecision::Allowed
    }
}
