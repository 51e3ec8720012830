use std::hash::Hasher;
use std::time::Instant;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// Screen-space rectangle in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Center point, the coordinate a tap should land on.
    pub const fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

/// One observable node of the foreground window.
///
/// Only nodes that carry content or afford interaction are surfaced; purely
/// decorative nodes never leave the capture walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiElement {
    /// Stable view id, when the app assigns one.
    pub view_id: Option<String>,
    /// Fully qualified platform class name.
    pub class_name: String,
    /// Visible text content.
    pub text: Option<String>,
    /// Accessibility label.
    pub content_description: Option<String>,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    pub checkable: bool,
    /// Present only when the element is checkable.
    pub checked: Option<bool>,
    pub focused: bool,
    pub enabled: bool,
    pub bounds: Bounds,
    pub child_count: usize,
}

impl UiElement {
    /// The element's label: text first, accessibility description second.
    pub fn label(&self) -> Option<&str> {
        non_empty(self.text.as_deref()).or_else(|| non_empty(self.content_description.as_deref()))
    }

    /// Whether the element carries any meaningful text content.
    pub fn has_content(&self) -> bool {
        self.label().is_some()
    }

    /// Simple class name, after the last `.` (e.g. "Button").
    pub fn class_simple(&self) -> &str {
        self.class_name.rsplit('.').next().unwrap_or(&self.class_name)
    }

    pub const fn center(&self) -> (i32, i32) {
        self.bounds.center()
    }

    /// Key under which near-identical siblings collapse: label plus a
    /// coarse spatial bucket plus the interaction flags.
    pub fn dedup_key(&self) -> (String, i32, i32, bool, bool) {
        let (cx, cy) = self.center();
        (
            self.label().unwrap_or_default().to_string(),
            cx / 20,
            cy / 20,
            self.clickable,
            self.editable,
        )
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Short deterministic hash identifying a screen for stability and
/// stagnation checks. Two snapshots with equal fingerprints are treated as
/// the same screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenFingerprint(pub u64);

impl std::fmt::Display for ScreenFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Snapshot of the foreground window, produced once per iteration and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ScreenState {
    /// Package of the foreground app. Authoritative from the last
    /// window-state event, falling back to the root node's package.
    pub package_name: String,
    /// Activity (screen) name, when the platform reports one.
    pub activity_name: Option<String>,
    /// Depth-first element list, bounded by the capture recursion cap.
    pub elements: Vec<UiElement>,
    /// The element holding input focus, if any.
    pub focused_element: Option<UiElement>,
    /// Monotonic capture time.
    pub captured_at: Instant,
}

impl ScreenState {
    /// An empty snapshot carrying only the tracked package/activity.
    pub fn empty(package_name: String, activity_name: Option<String>) -> Self {
        Self {
            package_name,
            activity_name,
            elements: Vec::new(),
            focused_element: None,
            captured_at: Instant::now(),
        }
    }

    /// Fingerprint over package, activity, and the first 20 label-bearing
    /// elements, labels cut to 20 chars and centers quantized to 50-pixel
    /// buckets.
    pub fn fingerprint(&self) -> ScreenFingerprint {
        let mut parts: Vec<String> = Vec::with_capacity(20);
        for element in self.elements.iter() {
            if parts.len() == 20 {
                break;
            }
            if let Some(label) = element.label() {
                let short: String = label.chars().take(20).collect();
                let (cx, _) = element.center();
                parts.push(format!("{}@{}", short, cx / 50));
            }
        }

        let material = format!(
            "{}|{}|{}",
            self.package_name,
            self.activity_name.as_deref().unwrap_or(""),
            parts.join(",")
        );

        let mut hasher = FxHasher::default();
        hasher.write(material.as_bytes());
        ScreenFingerprint(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(text: &str, left: i32, top: i32) -> UiElement {
        UiElement {
            view_id: None,
            class_name: "android.widget.TextView".into(),
            text: Some(text.into()),
            content_description: None,
            clickable: false,
            editable: false,
            scrollable: false,
            checkable: false,
            checked: None,
            focused: false,
            enabled: true,
            bounds: Bounds::new(left, top, left + 200, top + 60),
            child_count: 0,
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let state = ScreenState {
            package_name: "com.shop.app".into(),
            activity_name: Some("OrderActivity".into()),
            elements: vec![element("Your orders", 0, 100), element("Help", 0, 200)],
            focused_element: None,
            captured_at: Instant::now(),
        };

        let a = state.fingerprint();
        let b = state.fingerprint();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_ignores_sub_bucket_movement() {
        let mut state = ScreenState::empty("com.shop.app".into(), None);
        state.elements.push(element("Help", 100, 100));
        let before = state.fingerprint();

        // Move 10px within the same 50px bucket.
        state.elements[0].bounds = Bounds::new(110, 100, 310, 160);
        assert_eq!(before, state.fingerprint());

        // Move to a different bucket.
        state.elements[0].bounds = Bounds::new(400, 100, 600, 160);
        assert_ne!(before, state.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_package() {
        let a = ScreenState::empty("com.shop.app".into(), None).fingerprint();
        let b = ScreenState::empty("com.other.app".into(), None).fingerprint();
        assert_ne!(a, b);
    }

    #[test]
    fn label_prefers_text_over_description() {
        let mut e = element("Visible", 0, 0);
        e.content_description = Some("Described".into());
        assert_eq!(e.label(), Some("Visible"));

        e.text = Some("   ".into());
        assert_eq!(e.label(), Some("Described"));
    }
}
