//! Which rungs use which tag names.

use std::collections::HashMap;

use log::debug;

use crate::document::{Document, NodePath};

/// Rungs by the lower-case base names of the tags they use.
///
/// Built lazily by a transaction and dropped after any edit that adds,
/// removes or rewrites rungs.
#[derive(Debug, Default)]
pub(super) struct ReferenceIndex {
    rungs: HashMap<String, Vec<NodePath>>,
}

impl ReferenceIndex {
    pub(super) fn build(document: &Document) -> Self {
        let mut index = Self::default();
        let Ok(controller) = document.controller() else {
            return index;
        };

        let mut scanned = 0;
        for path in document.descendant_paths(&controller, "Rung") {
            let Some(text) = document.node(&path).and_then(|r| r.child_text("Text")) else {
                continue;
            };
            let Ok(rung) = l5x_rung::parse(text.trim()) else {
                continue;
            };
            for name in rung.tag_references(document.schema()).tags {
                index
                    .rungs
                    .entry(name.to_ascii_lowercase())
                    .or_default()
                    .push(path.clone());
            }
            scanned += 1;
        }
        debug!(rungs = scanned, names = index.rungs.len(); "Built reference index");
        index
    }

    /// Rungs using `name` as a tag base name, in document order.
    pub(super) fn rungs_referencing(&self, name: &str) -> &[NodePath] {
        self.rungs
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(super) fn is_referenced(&self, name: &str) -> bool {
        !self.rungs_referencing(name).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::sample;

    #[test]
    fn test_index_finds_rungs_by_tag() {
        let document = sample();
        let index = ReferenceIndex::build(&document);
        assert_eq!(index.rungs_referencing("START").len(), 1);
        assert!(index.is_referenced("speed"));
        assert!(!index.is_referenced("MOV"));
        assert_eq!(
            document.describe(&index.rungs_referencing("Speed")[0]),
            "Controller/Programs/Program[MainProgram]/Routines/Routine[MainRoutine]/RLLContent/Rung[0]"
        );
    }
}
