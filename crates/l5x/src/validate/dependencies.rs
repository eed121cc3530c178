//! Type references resolve, form no cycle, and point backwards in
//! declaration order. Module parents exist.

use l5x_core::ElementNode;

use super::{FindingKind, Findings, references::type_is_defined, scope::names_in};
use crate::document::{
    DependencyError, Document, NodePath, definition_of, resolve_insertion_order,
};

pub(super) fn check(document: &Document, findings: &mut Findings) {
    let Ok(controller) = document.controller() else {
        return;
    };
    check_member_types(document, &controller, findings);

    let mut types = document.user_types();
    types.extend(document.aoi_types());
    match resolve_insertion_order(&types) {
        Ok(_) => check_declaration_order(document, &controller, findings),
        Err(DependencyError::CyclicDependency { cycle }) => {
            let locator = cycle
                .first()
                .and_then(|name| document.type_element_path(name))
                .map(|path| document.describe(&path))
                .unwrap_or_else(|| "Controller/DataTypes".to_string());
            findings.error(
                FindingKind::CyclicDependency,
                locator,
                format!("cyclic type dependency: {}", cycle.join(" -> ")),
            );
        }
        Err(err) => findings.error(FindingKind::UndefinedType, "Controller/DataTypes", err.to_string()),
    }

    check_parent_modules(document, &controller, findings);
}

/// `(container, label, member containers)` of every type-declaring element.
const DECLARATIONS: &[(&str, &str, &[(&str, &str)])] = &[
    ("DataTypes", "DataType", &[("Members", "Member")]),
    (
        "AddOnInstructionDefinitions",
        "AddOnInstructionDefinition",
        &[("Parameters", "Parameter"), ("LocalTags", "LocalTag")],
    ),
];

fn declaration_paths(document: &Document, controller: &NodePath, container: &str, label: &str) -> Vec<NodePath> {
    document
        .find(controller, &[(container, None)])
        .map(|c| document.children_paths(&c, label))
        .unwrap_or_default()
}

fn check_member_types(document: &Document, controller: &NodePath, findings: &mut Findings) {
    for &(container, label, member_containers) in DECLARATIONS {
        for path in declaration_paths(document, controller, container, label) {
            for &(members, member_label) in member_containers {
                let Some(members) = document.find(&path, &[(members, None)]) else {
                    continue;
                };
                for member in document.children_paths(&members, member_label) {
                    let Some(data_type) = document.node(&member).and_then(|m| m.attribute("DataType"))
                    else {
                        continue;
                    };
                    if data_type.eq_ignore_ascii_case("BIT") || type_is_defined(document, data_type) {
                        continue;
                    }
                    findings.error(
                        FindingKind::UndefinedType,
                        document.describe(&member),
                        format!("data type `{data_type}` is not defined"),
                    );
                }
            }
        }
    }
}

/// A declaration may only use types declared before it in the same container.
fn check_declaration_order(document: &Document, controller: &NodePath, findings: &mut Findings) {
    for &(container, label, _) in DECLARATIONS {
        let paths = declaration_paths(document, controller, container, label);
        let names: Vec<String> = paths
            .iter()
            .map(|p| {
                document
                    .node(p)
                    .and_then(ElementNode::name)
                    .unwrap_or_default()
                    .to_ascii_lowercase()
            })
            .collect();

        for (index, path) in paths.iter().enumerate() {
            let Some(definition) = document.node(path).and_then(definition_of) else {
                continue;
            };
            for dependency in definition.dependencies() {
                let later = names[index..]
                    .iter()
                    .position(|n| n.eq_ignore_ascii_case(dependency))
                    .is_some_and(|offset| offset > 0);
                if later {
                    findings.error(
                        FindingKind::DeclarationOrder,
                        document.describe(path),
                        format!("`{}` uses `{dependency}`, which is declared after it", definition.name()),
                    );
                }
            }
        }
    }
}

fn check_parent_modules(document: &Document, controller: &NodePath, findings: &mut Findings) {
    let Some(controller_node) = document.node(controller) else {
        return;
    };
    let modules = names_in(controller_node, "Modules", "Module");
    for path in declaration_paths(document, controller, "Modules", "Module") {
        let Some(parent) = document.node(&path).and_then(|m| m.attribute("ParentModule")) else {
            continue;
        };
        if !modules.iter().any(|m| m.eq_ignore_ascii_case(parent)) {
            findings.error(
                FindingKind::MissingParentModule,
                document.describe(&path),
                format!("parent module `{parent}` does not exist"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::sample;
    use crate::validate::{Category, Validator};

    fn data_type(name: &str, member_type: &str) -> ElementNode {
        ElementNode::new("DataType")
            .with_attribute("Name", name)
            .with_attribute("Family", "NoFamily")
            .with_attribute("Class", "User")
            .with_child(
                ElementNode::new("Members").with_child(
                    ElementNode::new("Member")
                        .with_attribute("Name", "Inner")
                        .with_attribute("DataType", member_type)
                        .with_attribute("Dimension", "0"),
                ),
            )
    }

    fn add_type(document: &mut Document, element: ElementNode) {
        let container = document.find_in_controller(&[("DataTypes", None)]).unwrap();
        document.insert_at(&container, element).unwrap();
    }

    fn kinds(document: &Document) -> Vec<FindingKind> {
        Validator::new()
            .run_category(document, Category::Dependencies)
            .findings()
            .iter()
            .map(|f| f.kind)
            .collect()
    }

    #[test]
    fn test_sample_dependencies_resolve() {
        assert!(kinds(&sample()).is_empty());
    }

    #[test]
    fn test_undefined_member_type() {
        let mut document = sample();
        add_type(&mut document, data_type("Pump", "Impeller"));
        let report = Validator::new().run_category(&document, Category::Dependencies);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::UndefinedType);
        assert_eq!(
            report.findings()[0].locator,
            "Controller/DataTypes/DataType[Pump]/Members/Member[Inner]"
        );
    }

    #[test]
    fn test_cycle_is_reported_once() {
        let mut document = sample();
        add_type(&mut document, data_type("Left", "Right"));
        add_type(&mut document, data_type("Right", "Left"));
        assert_eq!(kinds(&document), [FindingKind::CyclicDependency]);
    }

    #[test]
    fn test_forward_reference_is_a_declaration_order_error() {
        let mut document = sample();
        add_type(&mut document, data_type("Skid", "Pump"));
        add_type(&mut document, data_type("Pump", "Valve"));
        let report = Validator::new().run_category(&document, Category::Dependencies);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::DeclarationOrder);
        assert_eq!(report.findings()[0].locator, "Controller/DataTypes/DataType[Skid]");
    }

    #[test]
    fn test_missing_parent_module() {
        let mut document = sample();
        let modules = document.find_in_controller(&[("Modules", None)]).unwrap();
        let module = ElementNode::new("Module")
            .with_attribute("Name", "Rack1")
            .with_attribute("ParentModule", "Bridge")
            .with_attribute("ParentModPortId", "2");
        document.insert_at(&modules, module).unwrap();
        assert_eq!(kinds(&document), [FindingKind::MissingParentModule]);
    }
}
