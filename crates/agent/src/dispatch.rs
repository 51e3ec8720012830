//! Maps validated actions onto engine operations and reports what happened.

use redress_drivers::AccessibilityEngine;
use redress_types::{ActionOutcome, AgentAction, ScreenState};

/// Labels tried, in order, to send a typed message.
const SEND_LABELS: &[&str] = &["Send", "Submit"];

/// View-id candidates tried when no send label matches. Bare names are
/// qualified with the foreground package by the engine.
const SEND_VIEW_IDS: &[&str] = &["send_button", "btn_send", "send", "submit", "send_button_sms"];

/// Labels that reveal an attach/upload affordance.
const UPLOAD_LABELS: &[&str] =
    &["Attach", "Upload", "Add file", "Choose file", "Photo", "Image", "File"];

/// How long `Wait` lets the screen settle.
const WAIT_TIMEOUT_MS: u64 = 5000;

/// Executes one action against the engine.
pub struct ActionExecutor<'a> {
    engine: &'a AccessibilityEngine,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(engine: &'a AccessibilityEngine) -> Self {
        Self { engine }
    }

    /// Dispatches `action`; `screen` is the snapshot the decision was made
    /// on, used to resolve index-based clicks.
    pub async fn execute(&self, action: &AgentAction, screen: &ScreenState) -> ActionOutcome {
        match action {
            AgentAction::TypeMessage { text } => self.type_message(text).await,
            AgentAction::ClickElement { label, index, .. } => {
                self.click(label.as_deref(), *index, screen).await
            }
            AgentAction::ScrollForward { .. } => {
                if self.engine.scroll_screen_forward() {
                    ActionOutcome::Success
                } else {
                    ActionOutcome::Failed { reason: "no scrollable container".into() }
                }
            }
            AgentAction::ScrollBackward { .. } => {
                if self.engine.scroll_screen_backward() {
                    ActionOutcome::Success
                } else {
                    ActionOutcome::Failed { reason: "no scrollable container".into() }
                }
            }
            AgentAction::Wait { .. } => {
                // Best effort by design: an unchanged screen is a valid
                // observation too.
                self.engine.wait_for_content_change(WAIT_TIMEOUT_MS).await;
                ActionOutcome::Success
            }
            AgentAction::UploadFile { .. } => self.upload().await,
            AgentAction::PressBack { .. } => {
                if self.engine.press_back() {
                    ActionOutcome::Success
                } else {
                    ActionOutcome::Failed { reason: "back navigation rejected".into() }
                }
            }
            AgentAction::RequestHumanReview { reason, input_prompt } => {
                ActionOutcome::HumanReviewNeeded {
                    reason: reason.clone(),
                    input_prompt: input_prompt.clone(),
                }
            }
            AgentAction::MarkResolved { summary } => {
                ActionOutcome::Resolved { summary: summary.clone() }
            }
        }
    }

    /// Enter text into the first input field, then try to send. A missing
    /// send button does not downgrade the outcome; the message may still be
    /// sitting in the box for a later explicit send.
    async fn type_message(&self, text: &str) -> ActionOutcome {
        let fields = self.engine.find_input_fields();
        let Some(field) = fields.first() else {
            return ActionOutcome::Failed { reason: "no input field on screen".into() };
        };

        if !self.engine.set_text(field.as_ref(), text) {
            return ActionOutcome::Failed { reason: "could not enter text".into() };
        }
        drop(fields);

        let mut sent = false;
        for label in SEND_LABELS {
            if self.engine.click_by_text(label).await {
                sent = true;
                break;
            }
        }
        if !sent {
            for view_id in SEND_VIEW_IDS {
                if let Some(button) = self.engine.find_node_by_id(view_id) {
                    if self.engine.click_node(button.as_ref()).await {
                        sent = true;
                        break;
                    }
                }
            }
        }
        if !sent {
            tracing::debug!("message entered but no send control found");
        }

        ActionOutcome::Success
    }

    async fn click(
        &self,
        label: Option<&str>,
        index: Option<usize>,
        screen: &ScreenState,
    ) -> ActionOutcome {
        if let Some(label) = label {
            return if self.engine.click_by_text(label).await {
                ActionOutcome::Success
            } else {
                ActionOutcome::Failed {
                    reason: format!("element \"{}\" not found or not clicked", label),
                }
            };
        }

        if let Some(index) = index {
            let target = screen.elements.iter().filter(|e| e.clickable).nth(index);
            return match target {
                Some(element) => {
                    let (x, y) = element.center();
                    if self.engine.tap_at(x, y).await {
                        ActionOutcome::Success
                    } else {
                        ActionOutcome::Failed {
                            reason: format!("tap on clickable #{} failed", index),
                        }
                    }
                }
                None => ActionOutcome::Failed {
                    reason: format!("no clickable element at index {}", index),
                },
            };
        }

        ActionOutcome::Failed { reason: "click with neither label nor index".into() }
    }

    async fn upload(&self) -> ActionOutcome {
        for label in UPLOAD_LABELS {
            if self.engine.click_by_text(label).await {
                return ActionOutcome::Success;
            }
        }
        ActionOutcome::Failed { reason: "no attach control found".into() }
    }
}
