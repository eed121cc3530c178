//! Name tables of the scopes a rung can see.

use std::collections::HashMap;

use l5x_core::ElementNode;

use crate::document::{Document, NodePath};

/// Case-insensitive multiset of names.
#[derive(Debug, Default)]
pub(super) struct NameSet(HashMap<String, usize>);

impl NameSet {
    pub(super) fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::default();
        for name in names {
            *set.0.entry(name.to_ascii_lowercase()).or_default() += 1;
        }
        set
    }

    pub(super) fn count(&self, name: &str) -> usize {
        self.0.get(&name.to_ascii_lowercase()).copied().unwrap_or(0)
    }

    pub(super) fn contains(&self, name: &str) -> bool {
        self.count(name) > 0
    }
}

/// How a rung operand resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Resolution {
    Found,
    /// Several entities of the nearest matching scope share the name.
    Ambiguous,
    Missing,
}

fn resolve_in(set: &NameSet, name: &str) -> Option<Resolution> {
    match set.count(name) {
        0 => None,
        1 => Some(Resolution::Found),
        _ => Some(Resolution::Ambiguous),
    }
}

/// A program or Add-On Instruction and the names visible to its routines.
#[derive(Debug)]
pub(super) struct LocalScope {
    pub(super) path: NodePath,
    pub(super) name: String,
    pub(super) is_aoi: bool,
    pub(super) tags: NameSet,
    pub(super) routines: NameSet,
}

/// Every scope of a project.
#[derive(Debug)]
pub(super) struct ProjectScope {
    pub(super) controller_tags: NameSet,
    pub(super) modules: NameSet,
    pub(super) locals: Vec<LocalScope>,
}

/// Names of the `label` children of `parent`'s `container` child.
pub(super) fn names_in<'a>(
    parent: &'a ElementNode,
    container: &str,
    label: &'a str,
) -> Vec<&'a str> {
    parent
        .child(container)
        .map(|c| c.children_labeled(label).filter_map(ElementNode::name).collect())
        .unwrap_or_default()
}

impl ProjectScope {
    pub(super) fn collect(document: &Document) -> Option<Self> {
        let controller_path = document.controller().ok()?;
        let controller = document.node(&controller_path)?;

        let mut locals = Vec::new();
        for (container, label) in [
            ("Programs", "Program"),
            ("AddOnInstructionDefinitions", "AddOnInstructionDefinition"),
        ] {
            let Some(container) = document.find(&controller_path, &[(container, None)]) else {
                continue;
            };
            for path in document.children_paths(&container, label) {
                let Some(node) = document.node(&path) else {
                    continue;
                };
                let is_aoi = label != "Program";
                let tags = if is_aoi {
                    let mut names = names_in(node, "Parameters", "Parameter");
                    names.extend(names_in(node, "LocalTags", "LocalTag"));
                    NameSet::from_names(names)
                } else {
                    NameSet::from_names(names_in(node, "Tags", "Tag"))
                };
                locals.push(LocalScope {
                    name: node.name().unwrap_or_default().to_string(),
                    is_aoi,
                    tags,
                    routines: NameSet::from_names(names_in(node, "Routines", "Routine")),
                    path,
                });
            }
        }

        Some(Self {
            controller_tags: NameSet::from_names(names_in(controller, "Tags", "Tag")),
            modules: NameSet::from_names(names_in(controller, "Modules", "Module")),
            locals,
        })
    }

    /// Resolve a base tag name as seen from a routine of `local`.
    ///
    /// The nearest scope holding the name wins. Add-On Instruction logic
    /// sees only its parameters and local tags.
    pub(super) fn resolve(&self, local: &LocalScope, name: &str) -> Resolution {
        if let Some(found) = resolve_in(&local.tags, name) {
            return found;
        }
        if !local.is_aoi {
            if let Some(found) = resolve_in(&self.controller_tags, name) {
                return found;
            }
        }
        if self.is_io_name(name) {
            Resolution::Found
        } else {
            Resolution::Missing
        }
    }

    /// Module-defined I/O tags (`Local:1:I`) and controller status flags
    /// (`S:FS`).
    fn is_io_name(&self, name: &str) -> bool {
        match name.split_once(':') {
            Some((prefix, _)) => prefix.eq_ignore_ascii_case("S") || self.modules.contains(prefix),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::sample;

    #[test]
    fn test_program_scope_sees_controller_tags() {
        let document = sample();
        let scope = ProjectScope::collect(&document).unwrap();
        let main = &scope.locals[0];
        assert_eq!(main.name, "MainProgram");
        assert_eq!(scope.resolve(main, "speed"), Resolution::Found);
        assert_eq!(scope.resolve(main, "Start"), Resolution::Found);
        assert_eq!(scope.resolve(main, "Local:1:I"), Resolution::Found);
        assert_eq!(scope.resolve(main, "S:FS"), Resolution::Found);
        assert_eq!(scope.resolve(main, "Remote:1:I"), Resolution::Missing);
        assert_eq!(scope.resolve(main, "Stop"), Resolution::Missing);
    }

    #[test]
    fn test_duplicates_are_ambiguous() {
        let set = NameSet::from_names(["Pump", "PUMP", "Valve"]);
        assert_eq!(resolve_in(&set, "pump"), Some(Resolution::Ambiguous));
        assert_eq!(resolve_in(&set, "valve"), Some(Resolution::Found));
        assert_eq!(resolve_in(&set, "motor"), None);
    }
}
