//! The platform accessibility facade.
//!
//! The host wires the real OS accessibility service behind these traits; the
//! engine crate is their only consumer. Node handles are owning: whatever a
//! method hands out must be released, and release happens in `Drop`, so a
//! handle's lifetime is exactly its scope on every exit path.

pub mod mock;

use redress_types::Bounds;
use tokio::sync::oneshot;

/// An action performed on a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAction {
    Click,
    Focus,
    /// Select the byte range `[start, end)` of the node's text.
    SetSelection { start: usize, end: usize },
    SetText(String),
    ScrollForward,
    ScrollBackward,
}

/// A global navigation action, not bound to any node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Back,
    Home,
    Recents,
    Notifications,
}

/// A gesture path dispatched to the platform, in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureStroke {
    pub points: Vec<(f32, f32)>,
    pub duration_ms: u64,
}

impl GestureStroke {
    /// A single-point tap.
    pub fn tap(x: f32, y: f32) -> Self {
        Self { points: vec![(x, y)], duration_ms: 50 }
    }

    /// A straight-line swipe.
    pub fn swipe(x1: f32, y1: f32, x2: f32, y2: f32, duration_ms: u64) -> Self {
        Self { points: vec![(x1, y1), (x2, y2)], duration_ms }
    }
}

/// One node of the platform accessibility tree.
///
/// Implementations own the underlying platform handle and release it in
/// `Drop`; release failures are the implementation's to swallow (the handle
/// may already be gone). `child`/`parent` transfer ownership of the returned
/// handle to the caller.
pub trait UiNode: Send + Sync {
    fn view_id(&self) -> Option<String>;
    fn class_name(&self) -> String;
    fn text(&self) -> Option<String>;
    fn content_description(&self) -> Option<String>;
    /// Package of the window this node belongs to.
    fn package(&self) -> Option<String>;
    fn is_clickable(&self) -> bool;
    fn is_editable(&self) -> bool;
    fn is_scrollable(&self) -> bool;
    fn is_checkable(&self) -> bool;
    fn is_checked(&self) -> bool;
    fn is_focused(&self) -> bool;
    fn is_enabled(&self) -> bool;
    fn bounds(&self) -> Bounds;
    fn child_count(&self) -> usize;
    fn child(&self, index: usize) -> Option<Box<dyn UiNode>>;
    fn parent(&self) -> Option<Box<dyn UiNode>>;
    /// Performs a node action; `false` means the platform refused it.
    fn perform(&self, action: NodeAction) -> bool;
    /// Platform-side lookup by fully qualified view id.
    fn find_by_view_id(&self, view_id: &str) -> Vec<Box<dyn UiNode>>;
}

/// The platform surface: window roots, focus, gestures, global navigation.
///
/// Implementations guard every platform call; a platform exception surfaces
/// as an empty result, never a panic.
pub trait AccessibilityHost: Send + Sync {
    /// Root of the active window, if there is one.
    fn active_root(&self) -> Option<Box<dyn UiNode>>;

    /// Roots of all windows the platform reports, in z-order.
    fn window_roots(&self) -> Vec<Box<dyn UiNode>>;

    /// The node currently holding input focus, if any.
    fn focused_node(&self) -> Option<Box<dyn UiNode>>;

    /// Performs a global navigation action.
    fn perform_global(&self, action: GlobalAction) -> bool;

    /// Dispatches a gesture. The receiver resolves `true` on completion and
    /// `false` on cancellation; a dropped sender also reads as cancellation.
    /// The caller applies its own deadline.
    fn dispatch_gesture(&self, stroke: GestureStroke) -> oneshot::Receiver<bool>;
}
