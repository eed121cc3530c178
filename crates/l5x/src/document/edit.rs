//! Reversible primitive edits.
//!
//! Each primitive applies its change and pushes the information needed to
//! undo it. Rolling back pops and undoes edits until the journal is back at
//! the checkpoint.

use log::{debug, error, trace};

use l5x_core::{Content, ElementNode};

use super::{Document, DocumentError, NodePath, xml};

/// An applied edit and what is needed to undo it.
#[derive(Debug, Clone)]
enum Edit {
    Inserted {
        path: NodePath,
    },
    Removed {
        path: NodePath,
        node: ElementNode,
    },
    AttributeSet {
        path: NodePath,
        name: String,
        previous: Option<String>,
    },
    AttributeRemoved {
        path: NodePath,
        index: usize,
        name: String,
        value: String,
    },
    ContentReplaced {
        path: NodePath,
        previous: Content,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    edits: Vec<Edit>,
}

/// A point in the edit history that can be returned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Document {
    /// Mark the current state.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.edits.len())
    }

    /// Whether anything was edited after `checkpoint`.
    pub fn has_changes_since(&self, checkpoint: Checkpoint) -> bool {
        self.journal.edits.len() > checkpoint.0
    }

    /// Undo every edit made after `checkpoint`, newest first.
    pub fn rollback_to(&mut self, checkpoint: Checkpoint) {
        let count = self.journal.edits.len().saturating_sub(checkpoint.0);
        while self.journal.edits.len() > checkpoint.0 {
            let Some(edit) = self.journal.edits.pop() else {
                break;
            };
            self.undo(edit);
        }
        debug!(undone = count; "Rolled back document edits");
    }

    /// Accept the edits made after `checkpoint`.
    ///
    /// Committing the outermost checkpoint discards the history.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 == 0 {
            self.journal.edits.clear();
        }
    }

    fn undo(&mut self, edit: Edit) {
        // Inverses address nodes that the forward edit just touched, so a
        // missing node means the journal and the tree disagree.
        let outcome = match edit {
            Edit::Inserted { path } => self.raw_detach(&path).map(drop),
            Edit::Removed { path, node } => self.raw_insert(&path, node),
            Edit::AttributeSet {
                path,
                name,
                previous,
            } => self.node_mut(&path).map(|node| match previous {
                Some(value) => {
                    node.set_attribute(name, value);
                }
                None => {
                    node.remove_attribute(&name);
                }
            }),
            Edit::AttributeRemoved {
                path,
                index,
                name,
                value,
            } => self
                .node_mut(&path)
                .map(|node| node.insert_attribute_at(index, name, value)),
            Edit::ContentReplaced { path, previous } => self
                .node_mut(&path)
                .map(|node| {
                    node.replace_content(previous);
                }),
        };
        if let Err(err) = outcome {
            error!(err:%; "Journal entry could not be undone");
        }
    }

    fn raw_insert(&mut self, path: &NodePath, node: ElementNode) -> Result<(), DocumentError> {
        let (parent, index) = path
            .split_last()
            .ok_or_else(|| DocumentError::NotFound(path.to_string()))?;
        let parent_node = self.node_mut(&parent)?;
        let label = parent_node.label().to_string();
        let children = parent_node
            .children_mut()
            .ok_or(DocumentError::NotAContainer(label))?;
        if index > children.len() {
            return Err(DocumentError::NotFound(path.to_string()));
        }
        children.insert(index, node);
        Ok(())
    }

    fn raw_detach(&mut self, path: &NodePath) -> Result<ElementNode, DocumentError> {
        let (parent, index) = path
            .split_last()
            .ok_or_else(|| DocumentError::NotFound(path.to_string()))?;
        let parent_node = self.node_mut(&parent)?;
        if parent_node.text().is_some() || index >= parent_node.children().len() {
            return Err(DocumentError::NotFound(path.to_string()));
        }
        let children = parent_node
            .children_mut()
            .ok_or_else(|| DocumentError::NotFound(path.to_string()))?;
        Ok(children.remove(index))
    }

    /// Insert `node` as child `index` of `parent`, without ordering checks.
    ///
    /// An element holding an empty text payload becomes a container.
    pub(crate) fn insert_child(
        &mut self,
        parent: &NodePath,
        index: usize,
        node: ElementNode,
    ) -> Result<NodePath, DocumentError> {
        let container = self.node_mut(parent)?;
        let blank_text = container.text().map(|text| text.trim().is_empty());
        match blank_text {
            Some(true) => {
                let previous = container.replace_content(Content::Children(Vec::new()));
                self.journal.edits.push(Edit::ContentReplaced {
                    path: parent.clone(),
                    previous,
                });
            }
            Some(false) => {
                return Err(DocumentError::NotAContainer(container.label().to_string()));
            }
            None => {}
        }

        let path = parent.child(index);
        trace!(path:% = path, label = node.label(); "Inserting element");
        self.raw_insert(&path, node)?;
        self.journal.edits.push(Edit::Inserted { path: path.clone() });
        Ok(path)
    }

    /// Detach the node at `path` without cascading.
    pub(crate) fn detach(&mut self, path: &NodePath) -> Result<ElementNode, DocumentError> {
        let node = self.raw_detach(path)?;
        trace!(path:% = path, label = node.label(); "Detached element");
        self.journal.edits.push(Edit::Removed {
            path: path.clone(),
            node: node.clone(),
        });
        Ok(node)
    }

    /// Swap the node at `path` for `node`, keeping its position.
    pub fn replace_subtree(
        &mut self,
        path: &NodePath,
        node: ElementNode,
    ) -> Result<ElementNode, DocumentError> {
        let (parent, index) = path
            .split_last()
            .ok_or_else(|| DocumentError::NotFound(path.to_string()))?;
        let old = self.detach(path)?;
        self.insert_child(&parent, index, node)?;
        Ok(old)
    }

    /// Set an attribute, keeping its position when it already exists.
    ///
    /// Setting an attribute to its current value records nothing.
    pub fn set_attribute(
        &mut self,
        path: &NodePath,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DocumentError> {
        let value = value.into();
        let node = self.node_mut(path)?;
        if node.attribute(name) == Some(value.as_str()) {
            return Ok(());
        }
        let previous = node.set_attribute(name, value);
        self.journal.edits.push(Edit::AttributeSet {
            path: path.clone(),
            name: name.to_string(),
            previous,
        });
        Ok(())
    }

    /// Remove an attribute. Returns its former value.
    pub fn remove_attribute(
        &mut self,
        path: &NodePath,
        name: &str,
    ) -> Result<Option<String>, DocumentError> {
        let node = self.node_mut(path)?;
        let Some((index, value)) = node.remove_attribute(name) else {
            return Ok(None);
        };
        self.journal.edits.push(Edit::AttributeRemoved {
            path: path.clone(),
            index,
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(Some(value))
    }

    /// Replace the content of an element with text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::CdataDelimiter`] when the element is written
    /// as CDATA and the text contains `]]>`.
    pub fn set_text(&mut self, path: &NodePath, text: impl Into<String>) -> Result<(), DocumentError> {
        let text = text.into();
        let node = self.node_mut(path)?;
        if xml::is_cdata(node) {
            xml::check_cdata(node.label(), &text)?;
        }
        let previous = node.set_text(text);
        self.journal.edits.push(Edit::ContentReplaced {
            path: path.clone(),
            previous,
        });
        Ok(())
    }
}
