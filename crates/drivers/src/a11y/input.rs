//! Action execution: clicks, text entry, scrolling, gestures, navigation.

use std::time::Duration;

use redress_api::host::{GestureStroke, GlobalAction, NodeAction, UiNode};
use tokio::sync::oneshot;
use tokio::time::timeout;

use super::AccessibilityEngine;

/// How many ancestors to try when the node itself refuses the click.
const CLICKABLE_ANCESTOR_DEPTH: usize = 8;

/// Grace period past the gesture's own duration before giving up on its
/// completion callback.
const GESTURE_GRACE_MS: u64 = 2000;

/// Default swipe duration.
pub const DEFAULT_SWIPE_DURATION_MS: u64 = 300;

impl AccessibilityEngine {
    /// Clicks a node. Tries the node's own click action, then up to
    /// [`CLICKABLE_ANCESTOR_DEPTH`] ancestors, then falls back to a tap
    /// gesture at the node's center.
    pub async fn click_node(&self, node: &dyn UiNode) -> bool {
        if node.is_clickable() && node.perform(NodeAction::Click) {
            return true;
        }

        let mut ancestor = node.parent();
        for _ in 0..CLICKABLE_ANCESTOR_DEPTH {
            match ancestor {
                Some(current) => {
                    if current.is_clickable() && current.perform(NodeAction::Click) {
                        return true;
                    }
                    ancestor = current.parent();
                }
                None => break,
            }
        }

        let (cx, cy) = node.bounds().center();
        self.tap_at(cx, cy).await
    }

    /// Finds the best match for `text` and clicks it.
    pub async fn click_by_text(&self, text: &str) -> bool {
        match self.find_node_by_text(text) {
            Some(node) => self.click_node(node.as_ref()).await,
            None => false,
        }
    }

    /// Replaces an editable node's content with `text`.
    ///
    /// Focuses and clicks the field first (apps often reveal the keyboard
    /// and cursor on click), selects the existing content, then sets the
    /// text. Returns the platform's answer to the set-text action.
    pub fn set_text(&self, node: &dyn UiNode, text: &str) -> bool {
        if !node.is_editable() {
            return false;
        }

        node.perform(NodeAction::Focus);
        node.perform(NodeAction::Click);

        let existing_len = node.text().map_or(0, |t| t.len());
        node.perform(NodeAction::SetSelection { start: 0, end: existing_len });

        node.perform(NodeAction::SetText(text.to_string()))
    }

    pub fn scroll_node_forward(&self, node: &dyn UiNode) -> bool {
        node.perform(NodeAction::ScrollForward)
    }

    pub fn scroll_node_backward(&self, node: &dyn UiNode) -> bool {
        node.perform(NodeAction::ScrollBackward)
    }

    /// Scrolls the first scrollable container on screen forward.
    pub fn scroll_screen_forward(&self) -> bool {
        match self.find_scrollable_nodes().first() {
            Some(node) => node.perform(NodeAction::ScrollForward),
            None => false,
        }
    }

    /// Scrolls the first scrollable container on screen backward.
    pub fn scroll_screen_backward(&self) -> bool {
        match self.find_scrollable_nodes().first() {
            Some(node) => node.perform(NodeAction::ScrollBackward),
            None => false,
        }
    }

    pub fn press_back(&self) -> bool {
        self.host().perform_global(GlobalAction::Back)
    }

    pub fn press_home(&self) -> bool {
        self.host().perform_global(GlobalAction::Home)
    }

    pub fn press_recents(&self) -> bool {
        self.host().perform_global(GlobalAction::Recents)
    }

    pub fn open_notifications(&self) -> bool {
        self.host().perform_global(GlobalAction::Notifications)
    }

    /// Taps at absolute screen coordinates.
    pub async fn tap_at(&self, x: i32, y: i32) -> bool {
        let stroke = GestureStroke::tap(x as f32, y as f32);
        let duration_ms = stroke.duration_ms;
        let completion = self.host().dispatch_gesture(stroke);
        self.await_gesture(completion, duration_ms).await
    }

    /// Swipes between two points.
    pub async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: u64) -> bool {
        let stroke = GestureStroke::swipe(
            x1 as f32,
            y1 as f32,
            x2 as f32,
            y2 as f32,
            duration_ms,
        );
        let completion = self.host().dispatch_gesture(stroke);
        self.await_gesture(completion, duration_ms).await
    }

    /// `true` only on explicit completion; cancellation, a dropped callback,
    /// and the deadline all read as failure.
    async fn await_gesture(&self, completion: oneshot::Receiver<bool>, duration_ms: u64) -> bool {
        let deadline = Duration::from_millis(duration_ms + GESTURE_GRACE_MS);
        matches!(timeout(deadline, completion).await, Ok(Ok(true)))
    }
}
