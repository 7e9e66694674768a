//! Document - High-level document API

use crate::{DomTree, NodeId};

/// Document loading state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    url: String,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
    ready_state: ReadyState,
    media_loads: Vec<NodeId>,
}

impl Document {
    /// Create a document with `<html>`, `<head>` and `<body>`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Fresh nodes under a fresh root cannot violate the hierarchy
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);
        tree.take_mutations();

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
            ready_state: ReadyState::Loading,
            media_loads: Vec::new(),
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// The root element carries the `legacy` class
    pub fn is_legacy(&self) -> bool {
        self.tree.has_class(self.html_element, "legacy")
    }

    /// `src` of every `<script>` in the document
    pub fn scripts(&self) -> Vec<String> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .filter(|&n| self.tree.tag_name(n) == Some("script"))
            .filter_map(|n| self.tree.get_attribute(n, "src").map(str::to_string))
            .collect()
    }

    /// `href` of every stylesheet `<link>` in the document
    pub fn stylesheets(&self) -> Vec<String> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .filter(|&n| {
                self.tree.tag_name(n) == Some("link")
                    && self
                        .tree
                        .get_attribute(n, "rel")
                        .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"))
            })
            .filter_map(|n| self.tree.get_attribute(n, "href").map(str::to_string))
            .collect()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Update the ready state, returns true if it changed
    pub fn set_ready_state(&mut self, state: ReadyState) -> bool {
        if self.ready_state == state {
            return false;
        }
        tracing::debug!("Document ready state {:?} -> {:?}", self.ready_state, state);
        self.ready_state = state;
        true
    }

    /// Ask the host to (re)load a media element, as `HTMLMediaElement.load()`
    pub fn request_media_load(&mut self, media: NodeId) {
        tracing::debug!("Media load requested for {:?}", media);
        self.media_loads.push(media);
    }

    /// Media elements the host was asked to load, oldest first
    pub fn media_load_requests(&self) -> &[NodeId] {
        &self.media_loads
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
