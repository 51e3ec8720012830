//! Renders a [`ScreenState`] into the compact, spatially grouped text block
//! the model reads.
//!
//! The output is deterministic for a given snapshot and hard-capped in every
//! section, so a pathological screen cannot blow up the prompt.

use redress_types::{ScreenState, UiElement};
use rustc_hash::FxHashSet;

/// Fallback dimensions when a capture has no usable bounds.
const SENTINEL_WIDTH: i32 = 1080;
const SENTINEL_HEIGHT: i32 = 2400;

const BAR_ITEM_CAP: usize = 15;
const TEXT_ITEM_CAP: usize = 25;
const BUTTON_ITEM_CAP: usize = 30;
const LABEL_CHAR_CAP: usize = 150;

/// Produces the textual screen description sent to the model.
pub fn format_for_llm(state: &ScreenState) -> String {
    let (width, height) = estimate_dimensions(&state.elements);

    let visible = filter_elements(&state.elements, width, height);
    let (top, middle, bottom) = partition_zones(&visible, height);

    let mut out = String::with_capacity(2048);

    out.push_str(&format!("App: {}\n", state.package_name));
    if let Some(activity) = &state.activity_name {
        let simple = activity.rsplit('.').next().unwrap_or(activity);
        out.push_str(&format!("Screen: {}\n", simple));
    }
    if let Some(hint) = detect_pattern(&visible, &bottom) {
        out.push_str(&format!("Layout: {}\n", hint));
    }

    if !top.is_empty() {
        out.push_str("[TOP BAR]\n");
        push_bar(&mut out, &top, width);
    }

    out.push_str("[CONTENT]\n");
    push_content(&mut out, &middle);

    if !bottom.is_empty() {
        out.push_str("[BOTTOM BAR]\n");
        push_bar(&mut out, &bottom, width);
    }

    if let Some(focused) = &state.focused_element {
        out.push_str(&format!(
            "Focused: \"{}\"\n",
            focused.label().unwrap_or("empty")
        ));
    }

    out
}

fn estimate_dimensions(elements: &[UiElement]) -> (i32, i32) {
    let width = elements.iter().map(|e| e.bounds.right).max().unwrap_or(0);
    let height = elements.iter().map(|e| e.bounds.bottom).max().unwrap_or(0);
    if width <= 0 || height <= 0 {
        (SENTINEL_WIDTH, SENTINEL_HEIGHT)
    } else {
        (width, height)
    }
}

/// Drops elements the model cannot act on or read: unlabeled non-inputs,
/// sub-3px slivers, and anything entirely off-screen. Near-duplicates
/// collapse onto one entry. Scrollable containers stay even without a
/// label (they rarely carry one) so the scrollable count survives.
fn filter_elements<'a>(elements: &'a [UiElement], width: i32, height: i32) -> Vec<&'a UiElement> {
    let mut seen = FxHashSet::default();
    elements
        .iter()
        .filter(|e| e.label().is_some() || e.editable || e.scrollable)
        .filter(|e| e.bounds.width() > 2 && e.bounds.height() > 2)
        .filter(|e| {
            e.bounds.right > 0 && e.bounds.bottom > 0 && e.bounds.left < width && e.bounds.top < height
        })
        .filter(|e| seen.insert(e.dedup_key()))
        .collect()
}

/// Splits by vertical center: top eighth, bottom eighth, middle.
fn partition_zones<'a>(
    elements: &[&'a UiElement],
    height: i32,
) -> (Vec<&'a UiElement>, Vec<&'a UiElement>, Vec<&'a UiElement>) {
    let top_limit = height / 8;
    let bottom_limit = height * 7 / 8;

    let mut top = Vec::new();
    let mut middle = Vec::new();
    let mut bottom = Vec::new();

    for element in elements {
        let (_, cy) = element.center();
        if cy < top_limit {
            top.push(*element);
        } else if cy > bottom_limit {
            bottom.push(*element);
        } else {
            middle.push(*element);
        }
    }

    (top, middle, bottom)
}

const PATTERN_TABLE: &[(&str, &[&str])] = &[
    ("chat/messaging screen", &["type a message", "send", "message", "chat"]),
    ("order list", &["my orders", "order history", "track package", "order"]),
    ("help/support section", &["help", "support", "contact us", "faq"]),
    ("profile/account screen", &["profile", "account", "settings", "sign out"]),
    ("home/feed screen", &["home", "for you", "feed", "search"]),
];

/// First matching screen pattern, if any. Bottom navigation is recognized
/// structurally: three or more clickables parked in the bottom bar.
fn detect_pattern(visible: &[&UiElement], bottom: &[&UiElement]) -> Option<&'static str> {
    let labels: Vec<String> = visible
        .iter()
        .filter_map(|e| e.label())
        .map(|l| l.to_lowercase())
        .collect();

    for &(name, keywords) in PATTERN_TABLE {
        if labels
            .iter()
            .any(|label| keywords.iter().any(|k| label.contains(k)))
        {
            return Some(name);
        }
    }

    if bottom.iter().filter(|e| e.clickable).count() >= 3 {
        return Some("bottom navigation");
    }

    None
}

/// Bar entries: sorted left-to-right, capped, annotated with a coarse
/// horizontal position.
fn push_bar(out: &mut String, elements: &[&UiElement], width: i32) {
    let mut sorted: Vec<&&UiElement> = elements.iter().collect();
    sorted.sort_by_key(|e| e.center().0);

    for element in sorted.into_iter().take(BAR_ITEM_CAP) {
        let kind = if element.editable {
            "INPUT"
        } else if element.clickable {
            "btn"
        } else {
            "text"
        };
        let label = truncate_label(element.label().unwrap_or("empty"));
        let (cx, _) = element.center();
        let position = if cx < width / 3 {
            "(left)"
        } else if cx > width * 2 / 3 {
            "(right)"
        } else {
            ""
        };
        out.push_str(&format!("{}: \"{}\"{}\n", kind, label, position));
    }
}

fn push_content(out: &mut String, elements: &[&UiElement]) {
    let texts = elements
        .iter()
        .filter(|e| !e.clickable && !e.editable && e.label().is_some())
        .take(TEXT_ITEM_CAP);
    for element in texts {
        out.push_str(&format!(
            "text: \"{}\"\n",
            truncate_label(element.label().unwrap_or_default())
        ));
    }

    let clickables = elements.iter().filter(|e| e.clickable && !e.editable).take(BUTTON_ITEM_CAP);
    for element in clickables {
        let label = truncate_label(element.label().unwrap_or_default());
        let state = match element.checked {
            Some(true) => " [checked]",
            Some(false) => " [unchecked]",
            None => "",
        };
        out.push_str(&format!(
            "{}: \"{}\"{}\n",
            classify_clickable(&element.class_name),
            label,
            state
        ));
    }

    for element in elements.iter().filter(|e| e.editable) {
        let label = element
            .content_description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or(element.text.as_deref())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("empty");
        out.push_str(&format!("INPUT: \"{}\"\n", truncate_label(label)));
    }

    let scrollables = elements.iter().filter(|e| e.scrollable).count();
    if scrollables > 0 {
        out.push_str(&format!("scrollable containers: {}\n", scrollables));
    }
}

/// Button flavor from the class name.
fn classify_clickable(class_name: &str) -> &'static str {
    let class = class_name.to_lowercase();
    if class.contains("checkbox") {
        "checkbox"
    } else if class.contains("switch") {
        "switch"
    } else if class.contains("radio") {
        "radio"
    } else if class.contains("tab") {
        "tab"
    } else if class.contains("chip") {
        "chip"
    } else if class.contains("bottomnavigation") || class.contains("navigation") {
        "nav-btn"
    } else if class.contains("imagebutton") || class.contains("imageview") {
        "icon-btn"
    } else {
        "btn"
    }
}

/// Cuts a label to the emission cap, ellipsis included in the budget.
fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LABEL_CHAR_CAP {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(LABEL_CHAR_CAP - 1).collect();
    cut.push('…');
    cut
}
