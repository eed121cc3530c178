//! Entity names follow the identifier rule and are unique in their scope.

use std::collections::HashMap;

use l5x_core::naming::validate_name;

use super::{FindingKind, Findings};
use crate::document::{Document, NodePath};

pub(super) fn check(document: &Document, findings: &mut Findings) {
    let Ok(controller) = document.controller() else {
        return;
    };

    let mut types = entries(document, &controller, "DataTypes", "DataType");
    types.extend(entries(
        document,
        &controller,
        "AddOnInstructionDefinitions",
        "AddOnInstructionDefinition",
    ));
    check_group(document, &types, "data type", findings);

    for path in entries(document, &controller, "DataTypes", "DataType") {
        let members = entries(document, &path, "Members", "Member");
        check_group(document, &members, "member", findings);
    }
    for path in entries(
        document,
        &controller,
        "AddOnInstructionDefinitions",
        "AddOnInstructionDefinition",
    ) {
        let mut members = entries(document, &path, "Parameters", "Parameter");
        members.extend(entries(document, &path, "LocalTags", "LocalTag"));
        check_group(document, &members, "parameter or local tag", findings);
        check_group(document, &entries(document, &path, "Routines", "Routine"), "routine", findings);
    }

    check_group(document, &entries(document, &controller, "Tags", "Tag"), "tag", findings);
    check_group(document, &entries(document, &controller, "Modules", "Module"), "module", findings);
    check_group(document, &entries(document, &controller, "Tasks", "Task"), "task", findings);

    let programs = entries(document, &controller, "Programs", "Program");
    check_group(document, &programs, "program", findings);
    for program in &programs {
        check_group(document, &entries(document, program, "Tags", "Tag"), "tag", findings);
        check_group(document, &entries(document, program, "Routines", "Routine"), "routine", findings);
    }
}

/// Paths of the `label` children of `parent`'s `container` child.
fn entries(document: &Document, parent: &NodePath, container: &str, label: &str) -> Vec<NodePath> {
    document
        .find(parent, &[(container, None)])
        .map(|c| document.children_paths(&c, label))
        .unwrap_or_default()
}

/// Names of one scope: each must be valid, and each may appear once.
fn check_group(document: &Document, paths: &[NodePath], what: &str, findings: &mut Findings) {
    let mut seen: HashMap<String, String> = HashMap::new();
    for path in paths {
        let name = document
            .node(path)
            .and_then(|n| n.name())
            .unwrap_or_default();

        if let Err(err) = validate_name(name) {
            findings.error(FindingKind::InvalidName, document.describe(path), format!("{what} {err}"));
        }
        if name.is_empty() {
            continue;
        }
        match seen.get(&name.to_ascii_lowercase()) {
            Some(first) => findings.error(
                FindingKind::DuplicateName,
                document.describe(path),
                format!("{what} `{name}` duplicates `{first}`"),
            ),
            None => {
                seen.insert(name.to_ascii_lowercase(), name.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use l5x_core::ElementNode;

    use super::*;
    use crate::document::tests::sample;
    use crate::validate::{Category, Validator};

    fn add_controller_tag(document: &mut Document, name: &str) {
        let tags = document.find_in_controller(&[("Tags", None)]).unwrap();
        let tag = ElementNode::new("Tag")
            .with_attribute("Name", name)
            .with_attribute("TagType", "Base")
            .with_attribute("DataType", "DINT");
        document.insert_at(&tags, tag).unwrap();
    }

    #[test]
    fn test_sample_names_are_valid() {
        let report = Validator::new().run_category(&sample(), Category::Naming);
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn test_invalid_names() {
        let mut document = sample();
        add_controller_tag(&mut document, "a__b");
        add_controller_tag(&mut document, "9Lives");

        let report = Validator::new().run_category(&document, Category::Naming);
        let locators: Vec<_> = report.findings().iter().map(|f| f.locator.as_str()).collect();
        assert_eq!(locators, ["Controller/Tags/Tag[a__b]", "Controller/Tags/Tag[9Lives]"]);
        assert!(report.findings().iter().all(|f| f.kind == FindingKind::InvalidName));
    }

    #[test]
    fn test_duplicates_ignore_case() {
        let mut document = sample();
        add_controller_tag(&mut document, "START");

        let report = Validator::new().run_category(&document, Category::Naming);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::DuplicateName);
        assert!(report.findings()[0].message.contains("`Start`"));
    }

    #[test]
    fn test_same_name_in_different_scopes_is_allowed() {
        let mut document = sample();
        add_controller_tag(&mut document, "Speed");

        let report = Validator::new().run_category(&document, Category::Naming);
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn test_type_and_instruction_share_a_namespace() {
        let mut document = sample();
        let aoi = ElementNode::new("AddOnInstructionDefinition").with_attribute("Name", "valve");
        let controller = document.controller().unwrap();
        let container = document
            .ensure_container(&controller, "AddOnInstructionDefinitions")
            .unwrap();
        document.insert_at(&container, aoi).unwrap();

        let report = Validator::new().run_category(&document, Category::Naming);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::DuplicateName);
    }
}
