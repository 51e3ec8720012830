//! In-memory accessibility host for tests.
//!
//! Trees are described with [`MockNode`] builders and swapped at runtime via
//! [`MockHost::set_root`], so a test can script screen progressions. Every
//! handle the host gives out bumps a live-handle counter that drops back on
//! release; [`MockHost::live_handles`] must read zero after any engine call
//! returns and its results are dropped.

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use redress_types::Bounds;
use tokio::sync::oneshot;

use super::{AccessibilityHost, GestureStroke, GlobalAction, NodeAction, UiNode};

/// Builder for one mock tree node.
#[derive(Debug, Clone, Default)]
pub struct MockNode {
    view_id: Option<String>,
    class_name: String,
    text: Option<String>,
    content_description: Option<String>,
    package: Option<String>,
    clickable: bool,
    editable: bool,
    scrollable: bool,
    checkable: bool,
    checked: bool,
    focused: bool,
    enabled: bool,
    bounds: Bounds,
    children: Vec<MockNode>,
}

impl MockNode {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            enabled: true,
            bounds: Bounds::new(0, 0, 100, 100),
            ..Self::default()
        }
    }

    /// A full-screen root frame for the given package.
    pub fn root(package: &str) -> Self {
        Self::new("android.widget.FrameLayout")
            .package(package)
            .bounds(0, 0, 1080, 2400)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.content_description = Some(description.to_string());
        self
    }

    pub fn view_id(mut self, view_id: &str) -> Self {
        self.view_id = Some(view_id.to_string());
        self
    }

    pub fn package(mut self, package: &str) -> Self {
        self.package = Some(package.to_string());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn checkable(mut self, checked: bool) -> Self {
        self.checkable = true;
        self.checked = checked;
        self
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn bounds(mut self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.bounds = Bounds::new(left, top, right, bottom);
        self
    }

    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: Vec<MockNode>) -> Self {
        self.children.extend(children);
        self
    }

    fn build(self, parent: Weak<NodeData>) -> Arc<NodeData> {
        Arc::new_cyclic(|weak| NodeData {
            view_id: self.view_id,
            class_name: self.class_name,
            text: Mutex::new(self.text),
            content_description: self.content_description,
            package: self.package,
            clickable: self.clickable,
            editable: self.editable,
            scrollable: self.scrollable,
            checkable: self.checkable,
            checked: self.checked,
            focused: self.focused,
            enabled: self.enabled,
            bounds: self.bounds,
            parent,
            children: self
                .children
                .into_iter()
                .map(|c| c.build(weak.clone()))
                .collect(),
        })
    }
}

struct NodeData {
    view_id: Option<String>,
    class_name: String,
    text: Mutex<Option<String>>,
    content_description: Option<String>,
    package: Option<String>,
    clickable: bool,
    editable: bool,
    scrollable: bool,
    checkable: bool,
    checked: bool,
    focused: bool,
    enabled: bool,
    bounds: Bounds,
    parent: Weak<NodeData>,
    children: Vec<Arc<NodeData>>,
}

impl NodeData {
    fn log_label(&self) -> String {
        self.text
            .lock()
            .unwrap()
            .clone()
            .or_else(|| self.content_description.clone())
            .or_else(|| self.view_id.clone())
            .unwrap_or_else(|| self.class_name.clone())
    }
}

/// What a dispatched gesture should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureBehavior {
    /// Report completion immediately.
    Complete,
    /// Report cancellation immediately.
    Cancel,
    /// Never resolve; the caller's deadline decides.
    Hang,
}

struct HostShared {
    live_handles: AtomicIsize,
    total_obtained: AtomicIsize,
    actions: Mutex<Vec<String>>,
    gestures: Mutex<Vec<GestureStroke>>,
    gesture_behavior: Mutex<GestureBehavior>,
    hung_senders: Mutex<Vec<oneshot::Sender<bool>>>,
}

struct MockHandle {
    node: Arc<NodeData>,
    shared: Arc<HostShared>,
}

impl MockHandle {
    fn obtain(node: Arc<NodeData>, shared: Arc<HostShared>) -> Box<dyn UiNode> {
        shared.live_handles.fetch_add(1, Ordering::SeqCst);
        shared.total_obtained.fetch_add(1, Ordering::SeqCst);
        Box::new(Self { node, shared })
    }

    fn log(&self, entry: String) {
        self.shared.actions.lock().unwrap().push(entry);
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.shared.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl UiNode for MockHandle {
    fn view_id(&self) -> Option<String> {
        self.node.view_id.clone()
    }

    fn class_name(&self) -> String {
        self.node.class_name.clone()
    }

    fn text(&self) -> Option<String> {
        self.node.text.lock().unwrap().clone()
    }

    fn content_description(&self) -> Option<String> {
        self.node.content_description.clone()
    }

    fn package(&self) -> Option<String> {
        self.node.package.clone()
    }

    fn is_clickable(&self) -> bool {
        self.node.clickable
    }

    fn is_editable(&self) -> bool {
        self.node.editable
    }

    fn is_scrollable(&self) -> bool {
        self.node.scrollable
    }

    fn is_checkable(&self) -> bool {
        self.node.checkable
    }

    fn is_checked(&self) -> bool {
        self.node.checked
    }

    fn is_focused(&self) -> bool {
        self.node.focused
    }

    fn is_enabled(&self) -> bool {
        self.node.enabled
    }

    fn bounds(&self) -> Bounds {
        self.node.bounds
    }

    fn child_count(&self) -> usize {
        self.node.children.len()
    }

    fn child(&self, index: usize) -> Option<Box<dyn UiNode>> {
        self.node
            .children
            .get(index)
            .map(|c| MockHandle::obtain(c.clone(), self.shared.clone()))
    }

    fn parent(&self) -> Option<Box<dyn UiNode>> {
        self.node
            .parent
            .upgrade()
            .map(|p| MockHandle::obtain(p, self.shared.clone()))
    }

    fn perform(&self, action: NodeAction) -> bool {
        match action {
            NodeAction::Click => {
                self.log(format!("click:{}", self.node.log_label()));
                self.node.clickable && self.node.enabled
            }
            NodeAction::Focus => {
                self.log(format!("focus:{}", self.node.log_label()));
                true
            }
            NodeAction::SetSelection { .. } => self.node.editable,
            NodeAction::SetText(text) => {
                if !self.node.editable {
                    return false;
                }
                self.log(format!("set_text:{}", text));
                *self.node.text.lock().unwrap() = Some(text);
                true
            }
            NodeAction::ScrollForward => {
                self.log(format!("scroll_forward:{}", self.node.log_label()));
                self.node.scrollable
            }
            NodeAction::ScrollBackward => {
                self.log(format!("scroll_backward:{}", self.node.log_label()));
                self.node.scrollable
            }
        }
    }

    fn find_by_view_id(&self, view_id: &str) -> Vec<Box<dyn UiNode>> {
        let mut found = Vec::new();
        collect_by_view_id(&self.node, view_id, &self.shared, &mut found);
        found
    }
}

fn collect_by_view_id(
    node: &Arc<NodeData>,
    view_id: &str,
    shared: &Arc<HostShared>,
    found: &mut Vec<Box<dyn UiNode>>,
) {
    if node.view_id.as_deref() == Some(view_id) {
        found.push(MockHandle::obtain(node.clone(), shared.clone()));
    }
    for child in &node.children {
        collect_by_view_id(child, view_id, shared, found);
    }
}

fn find_focused(node: &Arc<NodeData>) -> Option<Arc<NodeData>> {
    if node.focused {
        return Some(node.clone());
    }
    node.children.iter().find_map(find_focused)
}

/// Scriptable in-memory host.
pub struct MockHost {
    windows: Mutex<Vec<Arc<NodeData>>>,
    shared: Arc<HostShared>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(Vec::new()),
            shared: Arc::new(HostShared {
                live_handles: AtomicIsize::new(0),
                total_obtained: AtomicIsize::new(0),
                actions: Mutex::new(Vec::new()),
                gestures: Mutex::new(Vec::new()),
                gesture_behavior: Mutex::new(GestureBehavior::Complete),
                hung_senders: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn with_root(root: MockNode) -> Self {
        let host = Self::new();
        host.set_root(root);
        host
    }

    /// Replaces all windows with a single root.
    pub fn set_root(&self, root: MockNode) {
        *self.windows.lock().unwrap() = vec![root.build(Weak::new())];
    }

    /// Replaces the window list; the first entry is the active window.
    pub fn set_windows(&self, roots: Vec<MockNode>) {
        *self.windows.lock().unwrap() =
            roots.into_iter().map(|r| r.build(Weak::new())).collect();
    }

    /// Removes every window (no root available).
    pub fn clear_windows(&self) {
        self.windows.lock().unwrap().clear();
    }

    pub fn set_gesture_behavior(&self, behavior: GestureBehavior) {
        *self.shared.gesture_behavior.lock().unwrap() = behavior;
    }

    /// Handles currently alive; zero when every obtained node was released.
    pub fn live_handles(&self) -> isize {
        self.shared.live_handles.load(Ordering::SeqCst)
    }

    /// Total handles ever obtained.
    pub fn total_obtained(&self) -> isize {
        self.shared.total_obtained.load(Ordering::SeqCst)
    }

    /// Every node action performed so far, e.g. `click:Help`.
    pub fn actions(&self) -> Vec<String> {
        self.shared.actions.lock().unwrap().clone()
    }

    pub fn gestures(&self) -> Vec<GestureStroke> {
        self.shared.gestures.lock().unwrap().clone()
    }
}

impl AccessibilityHost for MockHost {
    fn active_root(&self) -> Option<Box<dyn UiNode>> {
        self.windows
            .lock()
            .unwrap()
            .first()
            .map(|r| MockHandle::obtain(r.clone(), self.shared.clone()))
    }

    fn window_roots(&self) -> Vec<Box<dyn UiNode>> {
        self.windows
            .lock()
            .unwrap()
            .iter()
            .map(|r| MockHandle::obtain(r.clone(), self.shared.clone()))
            .collect()
    }

    fn focused_node(&self) -> Option<Box<dyn UiNode>> {
        let windows = self.windows.lock().unwrap();
        windows
            .iter()
            .find_map(find_focused)
            .map(|n| MockHandle::obtain(n, self.shared.clone()))
    }

    fn perform_global(&self, action: GlobalAction) -> bool {
        self.shared
            .actions
            .lock()
            .unwrap()
            .push(format!("global:{:?}", action));
        true
    }

    fn dispatch_gesture(&self, stroke: GestureStroke) -> oneshot::Receiver<bool> {
        self.shared.gestures.lock().unwrap().push(stroke);
        let (tx, rx) = oneshot::channel();
        match *self.shared.gesture_behavior.lock().unwrap() {
            GestureBehavior::Complete => {
                let _ = tx.send(true);
            }
            GestureBehavior::Cancel => {
                let _ = tx.send(false);
            }
            GestureBehavior::Hang => {
                self.shared.hung_senders.lock().unwrap().push(tx);
            }
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_balance_on_drop() {
        let host = MockHost::with_root(
            MockNode::root("com.example").child(MockNode::new("Button").text("Ok").clickable()),
        );

        {
            let root = host.active_root().unwrap();
            let child = root.child(0).unwrap();
            assert_eq!(child.text().as_deref(), Some("Ok"));
            assert_eq!(host.live_handles(), 2);
        }
        assert_eq!(host.live_handles(), 0);
        assert_eq!(host.total_obtained(), 2);
    }

    #[test]
    fn set_text_requires_editable() {
        let host = MockHost::with_root(
            MockNode::root("com.example")
                .child(MockNode::new("EditText").editable())
                .child(MockNode::new("TextView").text("static")),
        );

        let root = host.active_root().unwrap();
        let input = root.child(0).unwrap();
        let label = root.child(1).unwrap();

        assert!(input.perform(NodeAction::SetText("hello".into())));
        assert_eq!(input.text().as_deref(), Some("hello"));
        assert!(!label.perform(NodeAction::SetText("nope".into())));
    }
}
