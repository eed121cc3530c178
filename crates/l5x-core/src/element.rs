//! Generic labeled element tree.
//!
//! [`ElementNode`] is the in-memory form of one markup element: a label, an
//! insertion-ordered attribute map, and either child elements or a text
//! payload. Mixed content does not occur in project files and is not modeled.
//!
//! Detached nodes are freely built and mutated with the methods here. Once a
//! node is owned by a live document, every mutation goes through the
//! document's recorded edit operations instead.

use indexmap::IndexMap;

/// Content of an [`ElementNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Ordered child elements.
    Children(Vec<ElementNode>),
    /// Opaque text payload.
    Text(String),
}

impl Default for Content {
    fn default() -> Self {
        Content::Children(Vec::new())
    }
}

/// A labeled element with ordered attributes and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    label: String,
    attributes: IndexMap<String, String>,
    content: Content,
}

impl ElementNode {
    /// Create an empty element with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            attributes: IndexMap::new(),
            content: Content::default(),
        }
    }

    /// Builder form of [`ElementNode::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`ElementNode::push_child`].
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.push_child(child);
        self
    }

    /// Builder that appends every child of the iterator.
    pub fn with_children(mut self, children: impl IntoIterator<Item = ElementNode>) -> Self {
        for child in children {
            self.push_child(child);
        }
        self
    }

    /// Builder form of [`ElementNode::set_text`].
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Look up an attribute value by exact name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `Name` attribute, which identifies most project entities.
    pub fn name(&self) -> Option<&str> {
        self.attribute("Name")
    }

    /// Set an attribute, keeping its position if it already exists.
    ///
    /// Returns the previous value.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Insert an attribute at a specific position.
    ///
    /// Used to restore an attribute exactly where it was before removal.
    pub fn insert_attribute_at(
        &mut self,
        index: usize,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let index = index.min(self.attributes.len());
        self.attributes.shift_insert(index, name.into(), value.into());
    }

    /// Remove an attribute, returning its former position and value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<(usize, String)> {
        self.attributes
            .shift_remove_full(name)
            .map(|(index, _, value)| (index, value))
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// The text payload, if this element carries text.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Children(_) => None,
        }
    }

    /// Replace the content with a text payload, returning the old content.
    pub fn set_text(&mut self, text: impl Into<String>) -> Content {
        std::mem::replace(&mut self.content, Content::Text(text.into()))
    }

    /// Replace the content wholesale, returning the old content.
    pub fn replace_content(&mut self, content: Content) -> Content {
        std::mem::replace(&mut self.content, content)
    }

    /// Child elements. Empty for text elements.
    pub fn children(&self) -> &[ElementNode] {
        match &self.content {
            Content::Children(children) => children,
            Content::Text(_) => &[],
        }
    }

    /// Mutable access to the children.
    ///
    /// An element holding an empty text payload is turned into an element
    /// with children. Returns `None` for a non-empty text payload.
    pub fn children_mut(&mut self) -> Option<&mut Vec<ElementNode>> {
        if matches!(&self.content, Content::Text(text) if text.trim().is_empty()) {
            self.content = Content::Children(Vec::new());
        }
        match &mut self.content {
            Content::Children(children) => Some(children),
            Content::Text(_) => None,
        }
    }

    /// Append a child, discarding a blank text payload.
    pub fn push_child(&mut self, child: ElementNode) {
        if let Some(children) = self.children_mut() {
            children.push(child);
        } else {
            self.content = Content::Children(vec![child]);
        }
    }

    /// First child with the given label.
    pub fn child(&self, label: &str) -> Option<&ElementNode> {
        self.children().iter().find(|c| c.label == label)
    }

    /// Position of the first child with the given label.
    pub fn child_index(&self, label: &str) -> Option<usize> {
        self.children().iter().position(|c| c.label == label)
    }

    /// All children with the given label.
    pub fn children_labeled<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = &'a ElementNode> + 'a {
        self.children().iter().filter(move |c| c.label == label)
    }

    /// Position of the child with the given label and `Name`, compared
    /// case-insensitively.
    pub fn named_child_index(&self, label: &str, name: &str) -> Option<usize> {
        self.children().iter().position(|c| {
            c.label == label && c.name().is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    /// Child with the given label and `Name`, compared case-insensitively.
    pub fn named_child(&self, label: &str, name: &str) -> Option<&ElementNode> {
        self.named_child_index(label, name)
            .map(|index| &self.children()[index])
    }

    /// Text of the named child, if it carries text.
    pub fn child_text(&self, label: &str) -> Option<&str> {
        self.child(label).and_then(ElementNode::text)
    }

    /// Depth-first, pre-order iterator over this element and its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Iterator returned by [`ElementNode::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a ElementNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a ElementNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
