//! Node finders.
//!
//! Finders return owning handles; whatever they hand out is the caller's to
//! drop. Candidates that lose the selection are released before returning.

use redress_api::host::UiNode;

use super::{AccessibilityEngine, MAX_TREE_DEPTH};

impl AccessibilityEngine {
    /// All nodes whose text or description contains `text`,
    /// case-insensitively, in document order.
    pub fn find_nodes_by_text(&self, text: &str) -> Vec<Box<dyn UiNode>> {
        let needle = text.to_lowercase();
        self.collect_from_root(&|node| matches_text(node, &needle))
    }

    /// The best match for `text`: the first clickable one, else the first.
    pub fn find_node_by_text(&self, text: &str) -> Option<Box<dyn UiNode>> {
        let mut nodes = self.find_nodes_by_text(text);
        if nodes.is_empty() {
            return None;
        }
        let index = nodes.iter().position(|n| n.is_clickable()).unwrap_or(0);
        Some(nodes.swap_remove(index))
    }

    /// Looks a node up by view id. Bare names are qualified with the current
    /// package (`name` becomes `com.pkg:id/name`).
    pub fn find_node_by_id(&self, view_id: &str) -> Option<Box<dyn UiNode>> {
        let tracked = self.current_package();
        let root = self.resolve_root(tracked.as_deref())?;

        let qualified;
        let full_id = if view_id.contains(':') {
            view_id
        } else {
            let package = tracked
                .or_else(|| root.package())
                .unwrap_or_default();
            qualified = format!("{}:id/{}", package, view_id);
            &qualified
        };

        root.find_by_view_id(full_id).into_iter().next()
    }

    /// Editable fields, in document order.
    pub fn find_input_fields(&self) -> Vec<Box<dyn UiNode>> {
        self.collect_from_root(&|node| node.is_editable())
    }

    pub fn find_clickable_elements(&self) -> Vec<Box<dyn UiNode>> {
        self.collect_from_root(&|node| node.is_clickable())
    }

    pub fn find_scrollable_nodes(&self) -> Vec<Box<dyn UiNode>> {
        self.collect_from_root(&|node| node.is_scrollable())
    }

    fn collect_from_root(
        &self,
        predicate: &dyn Fn(&dyn UiNode) -> bool,
    ) -> Vec<Box<dyn UiNode>> {
        let tracked = self.current_package();
        let mut out = Vec::new();
        if let Some(root) = self.resolve_root(tracked.as_deref()) {
            collect_matching(root, 0, predicate, &mut out);
        }
        out
    }
}

fn matches_text(node: &dyn UiNode, needle: &str) -> bool {
    node.text()
        .map_or(false, |t| t.to_lowercase().contains(needle))
        || node
            .content_description()
            .map_or(false, |d| d.to_lowercase().contains(needle))
}

fn collect_matching(
    node: Box<dyn UiNode>,
    depth: usize,
    predicate: &dyn Fn(&dyn UiNode) -> bool,
    out: &mut Vec<Box<dyn UiNode>>,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }

    let matched = predicate(node.as_ref());
    // Remember the pre-order slot so parents land before their children.
    let slot = out.len();

    for index in 0..node.child_count() {
        if let Some(child) = node.child(index) {
            collect_matching(child, depth + 1, predicate, out);
        }
    }

    if matched {
        out.insert(slot, node);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use redress_api::host::mock::{MockHost, MockNode};

    use super::*;

    fn engine_with(root: MockNode) -> (Arc<MockHost>, AccessibilityEngine) {
        let host = Arc::new(MockHost::with_root(root));
        let engine = AccessibilityEngine::new(host.clone());
        (host, engine)
    }

    #[test]
    fn text_search_is_case_insensitive_and_covers_description() {
        let (_host, engine) = engine_with(
            MockNode::root("com.shop.app")
                .child(MockNode::new("android.widget.TextView").text("Contact Support"))
                .child(MockNode::new("android.widget.ImageButton").description("support icon")),
        );

        let nodes = engine.find_nodes_by_text("SUPPORT");
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn single_find_prefers_clickable() {
        let (host, engine) = engine_with(
            MockNode::root("com.shop.app")
                .child(MockNode::new("android.widget.TextView").text("Help center"))
                .child(MockNode::new("android.widget.Button").text("Help").clickable()),
        );

        let node = engine.find_node_by_text("help").unwrap();
        assert!(node.is_clickable());
        drop(node);
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn find_by_bare_id_qualifies_with_package() {
        let (_host, engine) = engine_with(
            MockNode::root("com.shop.app").child(
                MockNode::new("android.widget.ImageButton")
                    .view_id("com.shop.app:id/send_button")
                    .clickable(),
            ),
        );

        assert!(engine.find_node_by_id("send_button").is_some());
        assert!(engine.find_node_by_id("com.shop.app:id/send_button").is_some());
        assert!(engine.find_node_by_id("missing").is_none());
    }

    #[test]
    fn finders_release_losing_candidates() {
        let (host, engine) = engine_with(
            MockNode::root("com.shop.app")
                .child(MockNode::new("android.widget.TextView").text("Order A"))
                .child(MockNode::new("android.widget.TextView").text("Order B"))
                .child(MockNode::new("android.widget.Button").text("Order C").clickable()),
        );

        let node = engine.find_node_by_text("order");
        assert!(node.is_some());
        drop(node);
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn clickable_and_input_finders() {
        let (_host, engine) = engine_with(
            MockNode::root("com.shop.app")
                .child(MockNode::new("android.widget.Button").text("Ok").clickable())
                .child(MockNode::new("android.widget.EditText").editable())
                .child(MockNode::new("android.widget.TextView").text("plain")),
        );

        assert_eq!(engine.find_clickable_elements().len(), 1);
        assert_eq!(engine.find_input_fields().len(), 1);
    }

    #[test]
    fn results_are_in_document_order() {
        let (_host, engine) = engine_with(
            MockNode::root("com.shop.app")
                .child(
                    MockNode::new("android.widget.LinearLayout")
                        .child(MockNode::new("android.widget.TextView").text("first"))
                        .child(MockNode::new("android.widget.TextView").text("second")),
                )
                .child(MockNode::new("android.widget.TextView").text("third")),
        );

        let labels: Vec<String> = engine
            .find_nodes_by_text("r")
            .iter()
            .filter_map(|n| n.text())
            .collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
    }
}
