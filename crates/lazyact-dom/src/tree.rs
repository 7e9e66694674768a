//! DOM Tree (arena-based allocation)
//!
//! Detached nodes stay in the arena; only links change. Every child-list
//! change is appended to the mutation log.

use crate::{
    DOMRect, DOMTokenList, DomError, DomResult, ElementData, MutationRecord, Node, NodeData,
    NodeId, Selector, SelectorError,
};

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
    mutations: Vec<MutationRecord>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            mutations: Vec::new(),
        }
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached element with attributes
    pub fn create_element_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        if let Some(element) = self.element_mut(id) {
            for (name, value) in attrs {
                element.attrs.set_attribute(name, value);
            }
        }
        id
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Text(content.to_string()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Comment(content.to_string()))
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Append a child, moving it out of its current parent first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if matches!(self.node(parent)?.data, NodeData::Text(_) | NodeData::Comment(_)) {
            return Err(DomError::HierarchyRequest);
        }

        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        self.mutations.push(MutationRecord::added(parent, child));
        tracing::trace!("Appended {:?} to {:?}", child, parent);
        Ok(())
    }

    /// Remove a child from its parent
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.detach(child);
        Ok(())
    }

    /// Detach a node from its parent (no-op if already detached)
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.get(node).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&c| c != node);
        self.nodes[node.index()].parent = None;
        self.mutations.push(MutationRecord::removed(parent, node));
        tracing::trace!("Detached {:?} from {:?}", node, parent);
    }

    /// Clone a node; attributes, style and layout are copied verbatim
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let source = self.node(node)?;
        if matches!(source.data, NodeData::Document) {
            return Err(DomError::InvalidNodeType);
        }
        let data = source.data.clone();
        let rect = source.rect;
        let children = source.children.clone();

        let copy = self.push(data);
        self.nodes[copy.index()].rect = rect;
        if deep {
            for child in children {
                let child_copy = self.clone_node(child, true)?;
                self.nodes[child_copy.index()].parent = Some(copy);
                self.nodes[copy.index()].children.push(child_copy);
            }
        }
        Ok(copy)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children of a node
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// All descendants in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Inclusive containment check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Check if the node is attached to the document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(NodeId::ROOT, id)
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Lower-case tag name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get_attribute(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.attrs.has_attribute(name))
    }

    /// Set an attribute; ignored on non-element nodes
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attrs.set_attribute(name, value);
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.attrs.remove_attribute(name)
    }

    /// Parsed `class` attribute
    pub fn class_list(&self, id: NodeId) -> DOMTokenList {
        DOMTokenList::parse(self.get_attribute(id, "class").unwrap_or(""))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_list(id).contains(class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let mut list = self.class_list(id);
        if list.add(class) {
            self.set_attribute(id, "class", &list.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let mut list = self.class_list(id);
        if list.remove(class) {
            self.set_attribute(id, "class", &list.to_string());
        }
    }

    /// Inline style property
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)?.style.get(property)
    }

    /// Set an inline style property; an empty value clears it
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.style.set(property, value);
        }
    }

    /// Layout rectangle
    pub fn rect(&self, id: NodeId) -> Option<DOMRect> {
        self.get(id).and_then(|n| n.rect)
    }

    /// Record the host's layout rectangle for a node
    pub fn set_rect(&mut self, id: NodeId, rect: DOMRect) {
        if let Some(node) = self.get_mut(id) {
            node.rect = Some(rect);
        }
    }

    // ------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------

    /// Check if an element matches a parsed selector
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    /// First matching descendant of `root`
    pub fn query_selector(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&n| selector.matches(self, n))
    }

    /// All matching descendants of `root`, in document order
    pub fn query_selector_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    /// Parse `selector` and query all matching descendants
    pub fn select(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        Ok(self.query_selector_all(root, &Selector::parse(selector)?))
    }

    /// Closest inclusive ancestor matching the selector
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| selector.matches(self, n))
    }

    // ------------------------------------------------------------------
    // Mutation log
    // ------------------------------------------------------------------

    /// Drain pending child-list records
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }
}
