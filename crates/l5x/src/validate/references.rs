//! Rung operands, routine targets and tag types resolve.

use l5x_core::ElementNode;

use super::{
    FindingKind, Findings,
    scope::{LocalScope, ProjectScope, Resolution},
};
use crate::document::{Document, NodePath};

pub(super) fn check(document: &Document, findings: &mut Findings) {
    let Some(scope) = ProjectScope::collect(document) else {
        return;
    };

    for local in &scope.locals {
        for rung_path in document.descendant_paths(&local.path, "Rung") {
            check_rung(document, &scope, local, &rung_path, findings);
        }
    }

    check_tag_types(document, findings);
    check_aliases(document, &scope, findings);
}

fn check_rung(
    document: &Document,
    scope: &ProjectScope,
    local: &LocalScope,
    rung_path: &NodePath,
    findings: &mut Findings,
) {
    let Some(text) = document.node(rung_path).and_then(|r| r.child_text("Text")) else {
        return;
    };
    // Unparseable rungs are reported by the rung category.
    let Ok(rung) = l5x_rung::parse(text.trim()) else {
        return;
    };
    let references = rung.tag_references(document.schema());

    for name in &references.tags {
        match scope.resolve(local, name) {
            Resolution::Found => {}
            Resolution::Ambiguous => findings.warning(
                FindingKind::AmbiguousReference,
                document.describe(rung_path),
                format!("`{name}` matches more than one tag in `{}`", local.name),
            ),
            Resolution::Missing => findings.error(
                FindingKind::UndefinedTag,
                document.describe(rung_path),
                format!("tag `{name}` is not visible from `{}`", local.name),
            ),
        }
    }
    for routine in &references.routines {
        if !local.routines.contains(routine) {
            findings.error(
                FindingKind::UndefinedRoutine,
                document.describe(rung_path),
                format!("routine `{routine}` does not exist in `{}`", local.name),
            );
        }
    }
}

/// Paths of every controller and program tag.
pub(super) fn tag_paths(document: &Document) -> Vec<NodePath> {
    let Ok(controller) = document.controller() else {
        return Vec::new();
    };
    let mut paths = Vec::new();
    if let Some(tags) = document.find(&controller, &[("Tags", None)]) {
        paths.extend(document.children_paths(&tags, "Tag"));
    }
    if let Some(programs) = document.find(&controller, &[("Programs", None)]) {
        for program in document.children_paths(&programs, "Program") {
            if let Some(tags) = document.find(&program, &[("Tags", None)]) {
                paths.extend(document.children_paths(&tags, "Tag"));
            }
        }
    }
    paths
}

pub(super) fn is_alias(tag: &ElementNode) -> bool {
    tag.attribute("TagType") == Some("Alias")
}

fn check_tag_types(document: &Document, findings: &mut Findings) {
    for path in tag_paths(document) {
        let Some(tag) = document.node(&path) else {
            continue;
        };
        if is_alias(tag) {
            continue;
        }
        match tag.attribute("DataType") {
            Some(data_type) if type_is_defined(document, data_type) => {}
            Some(data_type) => findings.error(
                FindingKind::UndefinedType,
                document.describe(&path),
                format!("data type `{data_type}` is not defined"),
            ),
            None => findings.error(
                FindingKind::UndefinedType,
                document.describe(&path),
                "tag has no data type",
            ),
        }
    }
}

/// Whether a type name is elementary, predefined or declared in the project.
pub(super) fn type_is_defined(document: &Document, name: &str) -> bool {
    document.schema().is_known_type(name) || document.type_element_path(name).is_some()
}

/// An alias must point at a tag visible from where it is declared.
fn check_aliases(document: &Document, scope: &ProjectScope, findings: &mut Findings) {
    let controller_scope = LocalScope {
        path: NodePath::root(),
        name: "Controller".to_string(),
        is_aoi: false,
        tags: Default::default(),
        routines: Default::default(),
    };
    for path in tag_paths(document) {
        let Some(tag) = document.node(&path) else {
            continue;
        };
        let Some(target) = tag.attribute("AliasFor").filter(|_| is_alias(tag)) else {
            continue;
        };
        let base = target
            .split(['.', '['])
            .next()
            .unwrap_or(target);
        let local = scope
            .locals
            .iter()
            .filter(|l| !l.is_aoi)
            .find(|l| path.starts_with(&l.path))
            .unwrap_or(&controller_scope);
        if scope.resolve(local, base) == Resolution::Missing {
            findings.error(
                FindingKind::UndefinedTag,
                document.describe(&path),
                format!("alias target `{target}` does not exist"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{Category, Severity, Validator};
    use crate::document::tests::sample;

    fn set_rung_text(document: &mut Document, text: &str) -> NodePath {
        let rung = document
            .find_in_controller(&[
                ("Programs", None),
                ("Program", Some("MainProgram")),
                ("Routines", None),
                ("Routine", Some("MainRoutine")),
                ("RLLContent", None),
                ("Rung", None),
            ])
            .unwrap();
        let text_path = document.find(&rung, &[("Text", None)]).unwrap();
        document.set_text(&text_path, text).unwrap();
        rung
    }

    #[test]
    fn test_undefined_tag_and_routine() {
        let mut document = sample();
        set_rung_text(&mut document, "XIC(Start)XIC(Missing)JSR(Nowhere,0);");
        let report = Validator::new().run_category(&document, Category::References);
        let kinds: Vec<_> = report.findings().iter().map(|f| f.kind).collect();
        assert_eq!(kinds, [FindingKind::UndefinedTag, FindingKind::UndefinedRoutine]);
        assert!(report.findings()[0].message.contains("Missing"));
        assert!(report.findings()[0].locator.ends_with("RLLContent/Rung[0]"));
    }

    #[test]
    fn test_local_scope_shadows_controller() {
        let mut document = sample();
        let tags = document
            .find_in_controller(&[("Programs", None), ("Program", None), ("Tags", None)])
            .unwrap();
        let start = ElementNode::new("Tag")
            .with_attribute("Name", "Start")
            .with_attribute("TagType", "Base")
            .with_attribute("DataType", "BOOL");
        document.insert_at(&tags, start).unwrap();

        let report = Validator::new().run_category(&document, Category::References);
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn test_case_duplicates_in_nearest_scope_warn() {
        let mut document = sample();
        let tags = document
            .find_in_controller(&[("Programs", None), ("Program", None), ("Tags", None)])
            .unwrap();
        let twin = ElementNode::new("Tag")
            .with_attribute("Name", "SPEED")
            .with_attribute("TagType", "Base")
            .with_attribute("DataType", "DINT");
        document.insert_at(&tags, twin).unwrap();

        let report = Validator::new().run_category(&document, Category::References);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::AmbiguousReference);
        assert_eq!(report.findings()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_undefined_tag_type() {
        let mut document = sample();
        let tags = document.find_in_controller(&[("Tags", None)]).unwrap();
        let tag = ElementNode::new("Tag")
            .with_attribute("Name", "Gizmo")
            .with_attribute("TagType", "Base")
            .with_attribute("DataType", "Widget");
        document.insert_at(&tags, tag).unwrap();

        let report = Validator::new().run_category(&document, Category::References);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::UndefinedType);
        assert_eq!(report.findings()[0].locator, "Controller/Tags/Tag[Gizmo]");
    }

    #[test]
    fn test_alias_target_must_exist() {
        let mut document = sample();
        let tags = document.find_in_controller(&[("Tags", None)]).unwrap();
        let alias = ElementNode::new("Tag")
            .with_attribute("Name", "Go")
            .with_attribute("TagType", "Alias")
            .with_attribute("AliasFor", "Begin.0");
        document.insert_at(&tags, alias).unwrap();

        let report = Validator::new().run_category(&document, Category::References);
        assert_eq!(report.len(), 1, "{report}");
        assert!(report.findings()[0].message.contains("Begin.0"));
    }
}
