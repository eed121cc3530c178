//! Schema-ordered insertion and cascading removal.

use log::{debug, trace};

use l5x_core::ElementNode;

use super::{Document, DocumentError, NodePath};

impl Document {
    /// Insert `child` into `container` at the position the schema mandates.
    ///
    /// The child goes before the first sibling ranked after it, so siblings
    /// with the same label keep their insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NoOrdering`] when the container has no child
    /// order and [`DocumentError::UnorderedLabel`] when the child's label is
    /// not part of it.
    pub fn insert_at(
        &mut self,
        container: &NodePath,
        child: ElementNode,
    ) -> Result<NodePath, DocumentError> {
        let index = self.ordered_index(container, child.label())?;
        self.insert_child(container, index, child)
    }

    /// Insert `child` as the `ordinal`th of its same-label siblings.
    ///
    /// Used for rungs and structured text lines, whose position matters.
    /// `ordinal` may equal the current count to append.
    pub fn insert_ordinal(
        &mut self,
        container: &NodePath,
        child: ElementNode,
        ordinal: usize,
    ) -> Result<NodePath, DocumentError> {
        let fallback = self.ordered_index(container, child.label())?;
        let node = self.require(container)?;
        let same: Vec<usize> = node
            .children()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.label() == child.label())
            .map(|(index, _)| index)
            .collect();

        let index = match (same.get(ordinal), same.last()) {
            (Some(&index), _) => index,
            (None, Some(&last)) if ordinal == same.len() => last + 1,
            (None, None) if ordinal == 0 => fallback,
            _ => {
                return Err(DocumentError::InvalidOrdinal {
                    label: child.label().to_string(),
                    ordinal,
                    count: same.len(),
                });
            }
        };
        self.insert_child(container, index, child)
    }

    /// Path of the first `label` child of `parent`, inserting an empty one in
    /// order when it is missing.
    pub fn ensure_container(
        &mut self,
        parent: &NodePath,
        label: &str,
    ) -> Result<NodePath, DocumentError> {
        if let Some(index) = self.require(parent)?.child_index(label) {
            return Ok(parent.child(index));
        }
        debug!(label; "Creating missing container");
        self.insert_at(parent, ElementNode::new(label))
    }

    /// Detach a node and everything that only existed because of it.
    ///
    /// Removing a `Program` drops its task schedule entries. Removing a
    /// program `Routine` clears the program's main and fault routine
    /// pointers to it. Removing a `Module` removes the modules whose
    /// `ParentModule` names it.
    pub fn remove_subtree(&mut self, path: &NodePath) -> Result<ElementNode, DocumentError> {
        let node = self.detach(path)?;
        let name = node.name().map(str::to_string);
        trace!(label = node.label(), name:?; "Removed subtree");

        match (node.label(), name) {
            ("Program", Some(name)) => self.remove_schedules(&name)?,
            ("Routine", Some(name)) => self.clear_routine_pointers(path, &name)?,
            ("Module", Some(name)) => self.remove_child_modules(&name)?,
            _ => {}
        }
        Ok(node)
    }

    fn ordered_index(&self, container: &NodePath, label: &str) -> Result<usize, DocumentError> {
        let node = self.require(container)?;
        let order = self
            .schema
            .child_order(node.label())
            .ok_or_else(|| DocumentError::NoOrdering(node.label().to_string()))?;
        let rank = order
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| DocumentError::UnorderedLabel {
                container: node.label().to_string(),
                child: label.to_string(),
            })?;

        let index = node
            .children()
            .iter()
            .position(|c| order.iter().position(|l| l == c.label()).is_some_and(|r| r > rank))
            .unwrap_or(node.children().len());
        trace!(container = node.label(), label, rank, index; "Computed insertion index");
        Ok(index)
    }

    fn remove_schedules(&mut self, program: &str) -> Result<(), DocumentError> {
        let Ok(controller) = self.controller() else {
            return Ok(());
        };
        let entries: Vec<NodePath> = self
            .descendant_paths(&controller, "ScheduledProgram")
            .into_iter()
            .filter(|p| {
                self.node(p)
                    .and_then(ElementNode::name)
                    .is_some_and(|n| n.eq_ignore_ascii_case(program))
            })
            .collect();
        for entry in entries.iter().rev() {
            self.detach(entry)?;
        }
        debug!(program, removed = entries.len(); "Removed schedule entries");
        Ok(())
    }

    fn clear_routine_pointers(&mut self, path: &NodePath, routine: &str) -> Result<(), DocumentError> {
        let Some(program) = path
            .split_last()
            .and_then(|(routines, _)| routines.split_last())
            .map(|(program, _)| program)
        else {
            return Ok(());
        };
        let Some(node) = self.node(&program) else {
            return Ok(());
        };
        if node.label() != "Program" {
            return Ok(());
        }
        let pointers: Vec<&str> = ["MainRoutineName", "FaultRoutineName"]
            .into_iter()
            .filter(|attr| {
                node.attribute(attr)
                    .is_some_and(|v| v.eq_ignore_ascii_case(routine))
            })
            .collect();
        for attr in pointers {
            self.remove_attribute(&program, attr)?;
        }
        Ok(())
    }

    fn remove_child_modules(&mut self, parent: &str) -> Result<(), DocumentError> {
        loop {
            let Some(modules) = self.find_in_controller(&[("Modules", None)]) else {
                return Ok(());
            };
            let child = self.children_paths(&modules, "Module").into_iter().find(|p| {
                self.node(p).is_some_and(|m| {
                    let is_child = m
                        .attribute("ParentModule")
                        .is_some_and(|v| v.eq_ignore_ascii_case(parent));
                    let is_self = m.name().is_some_and(|n| n.eq_ignore_ascii_case(parent));
                    is_child && !is_self
                })
            });
            match child {
                Some(child) => {
                    self.remove_subtree(&child)?;
                }
                None => return Ok(()),
            }
        }
    }
}
