//! Mandatory containers and schema child order.

use l5x_core::ElementNode;

use super::{FindingKind, Findings};
use crate::document::{Document, NodePath, ROOT_LABEL};

/// Elements whose ordered children may each appear only once.
const SINGLETON_PARENTS: &[&str] = &["Controller", "Program", "AddOnInstructionDefinition", "Task"];

pub(super) fn check(document: &Document, findings: &mut Findings) {
    let root = document.root();
    if root.label() != ROOT_LABEL {
        findings.error(
            FindingKind::MissingContainer,
            root.label(),
            format!("root element must be `{ROOT_LABEL}`"),
        );
    }
    if root.child("Controller").is_none() {
        findings.error(
            FindingKind::MissingContainer,
            ROOT_LABEL,
            "project has no `Controller` element",
        );
    }
    walk(document, root, &NodePath::root(), findings);
}

fn walk(document: &Document, node: &ElementNode, path: &NodePath, findings: &mut Findings) {
    if let Some(order) = document.schema().child_order(node.label()) {
        let rank = |label: &str| order.iter().position(|l| l == label);
        let mut highest: Option<(usize, &str)> = None;
        let mut seen: Vec<&str> = Vec::new();

        for (index, child) in node.children().iter().enumerate() {
            let Some(child_rank) = rank(child.label()) else {
                continue;
            };
            match highest {
                Some((top, top_label)) if child_rank < top => findings.error(
                    FindingKind::OrderingViolation,
                    document.describe(&path.child(index)),
                    format!("`{}` must come before `{top_label}`", child.label()),
                ),
                _ => highest = Some((child_rank, child.label())),
            }

            if SINGLETON_PARENTS.contains(&node.label()) {
                if seen.contains(&child.label()) {
                    findings.error(
                        FindingKind::DuplicateContainer,
                        document.describe(&path.child(index)),
                        format!("`{}` appears more than once", child.label()),
                    );
                } else {
                    seen.push(child.label());
                }
            }
        }
    }

    for (index, child) in node.children().iter().enumerate() {
        walk(document, child, &path.child(index), findings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::sample;
    use crate::validate::{Category, Validator};

    #[test]
    fn test_sample_order_is_valid() {
        let report = Validator::new().run_category(&sample(), Category::Structure);
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn test_misordered_and_duplicated_containers() {
        let mut document = sample();
        let controller = document.controller().unwrap();
        let tags = document.find(&controller, &[("Tags", None)]).unwrap();
        let copy = document.node(&tags).unwrap().clone();
        let removed = document.detach(&tags).unwrap();
        let count = document.node(&controller).unwrap().children().len();
        document.insert_child(&controller, count, removed).unwrap();
        document.insert_child(&controller, count, copy).unwrap();

        let report = Validator::new().run_category(&document, Category::Structure);
        let kinds: Vec<_> = report.findings().iter().map(|f| f.kind).collect();
        assert!(kinds.contains(&FindingKind::OrderingViolation), "{report}");
        assert!(kinds.contains(&FindingKind::DuplicateContainer), "{report}");
        assert!(report.findings().iter().all(|f| f.locator.starts_with("Controller/Tags")));
    }
}
