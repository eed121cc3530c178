//! Human-readable entity locators.

use super::{Document, NodePath};

/// Labels identified by position rather than by name.
const POSITIONAL_LABELS: &[&str] = &["Rung", "Line"];

impl Document {
    /// Render a path as a locator such as
    /// `Controller/Programs/Program[Main]/Routines/Routine[R1]/RLLContent/Rung[3]`.
    ///
    /// Named elements show their name, rungs and lines their position among
    /// their siblings. A path that no longer resolves ends in `?`.
    pub fn describe(&self, path: &NodePath) -> String {
        let mut parts = Vec::with_capacity(path.depth());
        let mut node = &self.root;

        for &index in path.steps() {
            let Some(child) = node.children().get(index) else {
                parts.push("?".to_string());
                break;
            };
            let label = child.label();
            let part = match child.name() {
                Some(name) if label != "Controller" => format!("{label}[{name}]"),
                _ if POSITIONAL_LABELS.contains(&label) => {
                    let ordinal = node.children()[..index]
                        .iter()
                        .filter(|c| c.label() == label)
                        .count();
                    format!("{label}[{ordinal}]")
                }
                _ => label.to_string(),
            };
            parts.push(part);
            node = child;
        }
        parts.join("/")
    }
}
