//! The accessibility engine: capture, finders, input, waits.

mod find;
mod input;
mod wait;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use redress_api::host::{AccessibilityHost, UiNode};
use redress_types::{ScreenState, UiElement};
use rustc_hash::FxHashSet;

/// Recursion cap for tree walks; deeper nodes are ignored.
const MAX_TREE_DEPTH: usize = 30;

/// The one component that interacts with the platform UI surface.
///
/// Holds the host facade plus three event-fed cells: the foreground package
/// and activity (written by window-state events, read at the top of every
/// loop iteration) and a one-shot content-change flag consumed by the waits.
/// The cells are single-writer/multi-reader; the loop tolerates reading a
/// value that is one event stale.
pub struct AccessibilityEngine {
    host: Arc<dyn AccessibilityHost>,
    current_package: Mutex<Option<String>>,
    current_activity: Mutex<Option<String>>,
    content_changed: AtomicBool,
}

impl AccessibilityEngine {
    pub fn new(host: Arc<dyn AccessibilityHost>) -> Self {
        Self {
            host,
            current_package: Mutex::new(None),
            current_activity: Mutex::new(None),
            content_changed: AtomicBool::new(false),
        }
    }

    pub(crate) fn host(&self) -> &dyn AccessibilityHost {
        self.host.as_ref()
    }

    // --- Event hooks (driven by the host's accessibility event stream) ---

    /// A window content-change event arrived.
    pub fn notify_content_changed(&self) {
        self.content_changed.store(true, Ordering::SeqCst);
    }

    /// A window-state event reported a new foreground package.
    pub fn set_current_package(&self, package: Option<String>) {
        *self.current_package.lock().unwrap_or_else(|e| e.into_inner()) = package;
    }

    /// A window-state event reported a new foreground activity.
    pub fn set_current_activity(&self, activity: Option<String>) {
        *self.current_activity.lock().unwrap_or_else(|e| e.into_inner()) = activity;
    }

    pub fn current_package(&self) -> Option<String> {
        self.current_package.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn current_activity(&self) -> Option<String> {
        self.current_activity.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn take_content_changed(&self) -> bool {
        self.content_changed.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn content_changed(&self) -> bool {
        self.content_changed.load(Ordering::SeqCst)
    }

    // --- Capture ---

    /// Captures the foreground window into a [`ScreenState`].
    ///
    /// Resolves the root against the event-tracked package (the active
    /// window can lag behind the foreground app), walks the tree depth-first
    /// up to [`MAX_TREE_DEPTH`], and keeps only nodes that carry content or
    /// afford interaction. Returns an empty state when no root exists.
    pub fn capture_screen_state(&self) -> ScreenState {
        let tracked_package = self.current_package();
        let tracked_activity = self.current_activity();

        let Some(root) = self.resolve_root(tracked_package.as_deref()) else {
            log::warn!("no active window root; returning empty capture");
            return ScreenState::empty(
                tracked_package.unwrap_or_default(),
                tracked_activity,
            );
        };

        let package_name = tracked_package
            .or_else(|| root.package())
            .unwrap_or_default();

        let mut elements = Vec::new();
        let mut seen = FxHashSet::default();
        collect_elements(root.as_ref(), 0, &mut elements, &mut seen);

        let focused_element = self.host.focused_node().map(|n| element_from(n.as_ref()));

        ScreenState {
            package_name,
            activity_name: tracked_activity,
            elements,
            focused_element,
            captured_at: Instant::now(),
        }
    }

    /// The root to walk: the active window's, unless it disagrees with the
    /// event-tracked package, in which case the first window whose root
    /// matches wins.
    pub(crate) fn resolve_root(&self, tracked_package: Option<&str>) -> Option<Box<dyn UiNode>> {
        let active = self.host.active_root();

        let Some(tracked) = tracked_package else {
            return active;
        };

        match active {
            Some(root) if root.package().as_deref() == Some(tracked) => Some(root),
            active => {
                for root in self.host.window_roots() {
                    if root.package().as_deref() == Some(tracked) {
                        return Some(root);
                    }
                }
                active
            }
        }
    }
}

/// Whether a node is worth surfacing: it carries text, a description, or an
/// interaction affordance. Everything else is decoration.
fn is_interesting(node: &dyn UiNode) -> bool {
    node.text().map_or(false, |t| !t.trim().is_empty())
        || node
            .content_description()
            .map_or(false, |d| !d.trim().is_empty())
        || node.is_clickable()
        || node.is_editable()
        || node.is_scrollable()
        || node.is_checkable()
}

pub(crate) fn element_from(node: &dyn UiNode) -> UiElement {
    let checkable = node.is_checkable();
    UiElement {
        view_id: node.view_id(),
        class_name: node.class_name(),
        text: node.text(),
        content_description: node.content_description(),
        clickable: node.is_clickable(),
        editable: node.is_editable(),
        scrollable: node.is_scrollable(),
        checkable,
        checked: checkable.then(|| node.is_checked()),
        focused: node.is_focused(),
        enabled: node.is_enabled(),
        bounds: node.bounds(),
        child_count: node.child_count(),
    }
}

fn collect_elements(
    node: &dyn UiNode,
    depth: usize,
    out: &mut Vec<UiElement>,
    seen: &mut FxHashSet<(String, i32, i32, bool, bool)>,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }

    if is_interesting(node) {
        let element = element_from(node);
        if seen.insert(element.dedup_key()) {
            out.push(element);
        }
    }

    for index in 0..node.child_count() {
        if let Some(child) = node.child(index) {
            collect_elements(child.as_ref(), depth + 1, out, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redress_api::host::mock::{MockHost, MockNode};

    fn chat_screen() -> MockNode {
        MockNode::root("com.shop.app")
            .child(
                MockNode::new("android.widget.LinearLayout")
                    // Decorative container: no content, no affordances.
                    .child(MockNode::new("android.widget.TextView").text("Order #123"))
                    .child(MockNode::new("android.widget.Button").text("Help").clickable()),
            )
            .child(MockNode::new("android.widget.EditText").editable().focused())
            .child(MockNode::new("android.view.View"))
    }

    #[test]
    fn capture_keeps_only_interesting_nodes() {
        let host = Arc::new(MockHost::with_root(chat_screen()));
        let engine = AccessibilityEngine::new(host.clone());

        let state = engine.capture_screen_state();

        let classes: Vec<&str> = state.elements.iter().map(|e| e.class_simple()).collect();
        assert_eq!(classes, vec!["TextView", "Button", "EditText"]);
        assert!(state
            .focused_element
            .as_ref()
            .is_some_and(|e| e.class_simple() == "EditText"));
    }

    #[test]
    fn capture_releases_every_handle() {
        let host = Arc::new(MockHost::with_root(chat_screen()));
        let engine = AccessibilityEngine::new(host.clone());

        let _state = engine.capture_screen_state();
        assert!(host.total_obtained() > 0);
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn capture_deduplicates_overlapping_twins() {
        let root = MockNode::root("com.shop.app")
            .child(MockNode::new("android.widget.TextView").text("Item").bounds(0, 100, 200, 160))
            .child(MockNode::new("android.widget.TextView").text("Item").bounds(4, 104, 204, 164));
        let host = Arc::new(MockHost::with_root(root));
        let engine = AccessibilityEngine::new(host);

        let state = engine.capture_screen_state();
        assert_eq!(state.elements.len(), 1);
    }

    #[test]
    fn capture_prefers_window_matching_tracked_package() {
        let host = Arc::new(MockHost::new());
        host.set_windows(vec![
            MockNode::root("com.android.systemui")
                .child(MockNode::new("android.widget.TextView").text("Status")),
            MockNode::root("com.shop.app")
                .child(MockNode::new("android.widget.TextView").text("Your orders")),
        ]);
        let engine = AccessibilityEngine::new(host);
        engine.set_current_package(Some("com.shop.app".into()));

        let state = engine.capture_screen_state();
        assert_eq!(state.package_name, "com.shop.app");
        assert_eq!(state.elements[0].text.as_deref(), Some("Your orders"));
    }

    #[test]
    fn capture_without_root_returns_tracked_package() {
        let host = Arc::new(MockHost::new());
        let engine = AccessibilityEngine::new(host);
        engine.set_current_package(Some("com.shop.app".into()));
        engine.set_current_activity(Some("MainActivity".into()));

        let state = engine.capture_screen_state();
        assert_eq!(state.package_name, "com.shop.app");
        assert_eq!(state.activity_name.as_deref(), Some("MainActivity"));
        assert!(state.elements.is_empty());
    }

    #[test]
    fn checked_only_present_when_checkable() {
        let root = MockNode::root("com.shop.app")
            .child(MockNode::new("android.widget.CheckBox").text("Subscribe").checkable(true))
            .child(MockNode::new("android.widget.TextView").text("Plain"));
        let host = Arc::new(MockHost::with_root(root));
        let engine = AccessibilityEngine::new(host);

        let state = engine.capture_screen_state();
        assert_eq!(state.elements[0].checked, Some(true));
        assert_eq!(state.elements[1].checked, None);
    }
}
