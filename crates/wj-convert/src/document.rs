//! Arena-backed mutable document tree.
//!
//! Nodes live in a flat arena and are addressed by copyable [`NodeId`]
//! handles. Detached nodes stay in the arena, so handles collected before a
//! mutation remain valid and [`Document::is_attached`] can tell whether a
//! node is still reachable from the root.

/// Handle of a node within a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node (always 0).
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered attribute list of an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    /// Create an empty attribute list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Iterate attributes in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a (possibly prefixed) tag name.
    Element {
        /// Qualified tag name, e.g. `ac:structured-macro`.
        tag: String,
        /// Attributes in source order.
        attrs: Attributes,
    },
    /// Character data.
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable document tree for one page revision.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root element.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    tag: "root".to_owned(),
                    attrs: Attributes::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: impl Into<String>, attrs: Attributes) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.into(),
            attrs,
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Node payload.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Tag name when `id` is an element.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether `id` is an element named `tag`.
    #[must_use]
    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Attribute value when `id` is an element.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs.get(name),
            NodeKind::Text(_) => None,
        }
    }

    /// Set an attribute on an element. No-op on text nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attrs, .. } = &mut self.node_mut(id).kind {
            attrs.set(name, value);
        }
    }

    /// Parent of a node, `None` for the root and detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children of a node in order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Append text to `parent`, merging with a trailing text child.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(&last) = self.node(parent).children.last()
            && let NodeKind::Text(existing) = &mut self.node_mut(last).kind
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }

    /// Remove a node from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    /// Put `replacement` at the position of `old`, detaching `old`.
    ///
    /// Returns `false` if `old` has no parent.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        self.detach(replacement);
        let children = &mut self.node_mut(parent).children;
        let Some(pos) = children.iter().position(|&c| c == old) else {
            return false;
        };
        children[pos] = replacement;
        self.node_mut(old).parent = None;
        self.node_mut(replacement).parent = Some(parent);
        true
    }

    /// Whether a node is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == NodeId::ROOT {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` is a proper ancestor of `id`.
    #[must_use]
    pub fn has_ancestor(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Closest proper ancestor element named `tag`.
    #[must_use]
    pub fn ancestor_named(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.is_element(node, tag) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Concatenated text of a subtree.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &self.node(id).children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Proper descendants of `id` in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Snapshot of all attached elements named `tag`, in document order.
    #[must_use]
    pub fn elements_named(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_element(id, tag))
            .collect()
    }

    /// Direct child elements of `id` named `tag`.
    #[must_use]
    pub fn child_elements_named(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c, tag))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let p = doc.create_element("p", Attributes::new());
        let strong = doc.create_element("strong", Attributes::new());
        let bold = doc.create_text("Bold");
        let tail = doc.create_text(" text");
        doc.append_child(doc.root(), p);
        doc.append_child(p, strong);
        doc.append_child(strong, bold);
        doc.append_child(p, tail);
        (doc, p, strong, tail)
    }

    #[test]
    fn test_text_content() {
        let (doc, p, _, _) = sample();
        assert_eq!(doc.text_content(p), "Bold text");
        assert_eq!(doc.text_content(doc.root()), "Bold text");
    }

    #[test]
    fn test_append_child_moves_node() {
        let (mut doc, p, strong, tail) = sample();
        let div = doc.create_element("div", Attributes::new());
        doc.append_child(doc.root(), div);
        doc.append_child(div, strong);

        assert_eq!(doc.children(p), &[tail]);
        assert_eq!(doc.children(div), &[strong]);
        assert_eq!(doc.parent(strong), Some(div));
    }

    #[test]
    fn test_replace_keeps_position() {
        let (mut doc, p, strong, tail) = sample();
        let em = doc.create_element("em", Attributes::new());
        assert!(doc.replace(strong, em));

        assert_eq!(doc.children(p), &[em, tail]);
        assert!(!doc.is_attached(strong));
        assert!(doc.is_attached(em));
    }

    #[test]
    fn test_replace_detached_is_noop() {
        let mut doc = Document::new();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        assert!(!doc.replace(a, b));
    }

    #[test]
    fn test_detached_subtree_not_attached() {
        let (mut doc, p, strong, _) = sample();
        doc.detach(p);
        assert!(!doc.is_attached(strong));
        assert!(doc.elements_named("strong").is_empty());
    }

    #[test]
    fn test_descendants_document_order() {
        let (doc, p, strong, tail) = sample();
        let bold = doc.children(strong)[0];
        assert_eq!(doc.descendants(doc.root()), vec![p, strong, bold, tail]);
    }

    #[test]
    fn test_ancestor_lookup() {
        let (doc, p, strong, _) = sample();
        let bold = doc.children(strong)[0];
        assert_eq!(doc.ancestor_named(bold, "p"), Some(p));
        assert!(doc.has_ancestor(bold, p));
        assert!(!doc.has_ancestor(p, bold));
    }

    #[test]
    fn test_attributes_keep_order() {
        let attrs: Attributes = [("b", "2"), ("a", "1")].into_iter().collect();
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_set_attr_replaces_value() {
        let mut doc = Document::new();
        let el = doc.create_element("pre", [("lang", "rust")].into_iter().collect());
        doc.set_attr(el, "lang", "go");
        doc.set_attr(el, "class", "x");
        assert_eq!(doc.attr(el, "lang"), Some("go"));
        assert_eq!(doc.attr(el, "class"), Some("x"));
    }
}
