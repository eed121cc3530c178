//! Container ordering, dependency ordering and the validation categories
//! that watch them.

use std::sync::Arc;

use proptest::prelude::*;

use l5x::{
    document::{DependencyError, Document, NodePath, resolve_insertion_order},
    validate::{Category, FindingKind, Severity, Validator},
};
use l5x_core::{ElementNode, Member, SchemaTable, TypeDefinition};
use l5x_rung::SyntaxKind;

fn bare_controller() -> Document {
    let xml = r#"<RSLogix5000Content SchemaRevision="1.0" TargetType="Controller">
<Controller Name="Plant"/>
</RSLogix5000Content>"#;
    Document::parse(xml, Arc::new(SchemaTable::standard())).unwrap()
}

fn user_type(name: &str, uses: &[&str]) -> TypeDefinition {
    TypeDefinition::user(
        name,
        uses.iter()
            .enumerate()
            .map(|(i, t)| Member::field(format!("M{i}"), *t, 0))
            .collect(),
    )
}

#[test]
fn test_chain_orders_leaf_first() {
    let types = [user_type("A", &["B"]), user_type("B", &["C"]), user_type("C", &["DINT"])];
    let order: Vec<_> = resolve_insertion_order(&types)
        .unwrap()
        .into_iter()
        .map(TypeDefinition::name)
        .collect();
    assert_eq!(order, ["C", "B", "A"]);
}

#[test]
fn test_cycle_names_its_members() {
    let types = [user_type("A", &["B"]), user_type("B", &["A"]), user_type("C", &[])];
    let err = resolve_insertion_order(&types).unwrap_err();
    assert_eq!(
        err,
        DependencyError::CyclicDependency {
            cycle: vec!["A".to_string(), "B".to_string(), "A".to_string()]
        }
    );
}

#[test]
fn test_missing_tasks_is_the_only_finding() {
    let document = bare_controller();
    let report = Validator::new().run(&document);

    assert_eq!(report.len(), 1, "{:?}", report.findings());
    let finding = &report.findings()[0];
    assert_eq!(finding.category, Category::Tasks);
    assert_eq!(finding.severity, Severity::Error);
    assert_eq!(finding.kind, FindingKind::NoTasks);
}

#[test]
fn test_unterminated_rung_is_a_syntax_finding() {
    let err = l5x_rung::parse("XIC(A)OTE(B)").unwrap_err();
    assert_eq!(err.kind(), SyntaxKind::MissingTerminator);

    let xml = r#"<RSLogix5000Content SchemaRevision="1.0" TargetType="Controller">
<Controller Name="Plant">
<Tags>
<Tag Name="A" TagType="Base" DataType="BOOL"/>
<Tag Name="B" TagType="Base" DataType="BOOL"/>
</Tags>
<Programs>
<Program Name="Main">
<Routines>
<Routine Name="Logic" Type="RLL">
<RLLContent>
<Rung Number="0" Type="N">
<Text>
<![CDATA[XIC(A)OTE(B)]]>
</Text>
</Rung>
</RLLContent>
</Routine>
</Routines>
</Program>
</Programs>
</Controller>
</RSLogix5000Content>"#;
    let document = Document::parse(xml, Arc::new(SchemaTable::standard())).unwrap();
    let report = Validator::new().run_category(&document, Category::Rungs);

    let findings: Vec<_> = report.errors().collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::RungSyntax(SyntaxKind::MissingTerminator));
    assert_eq!(
        findings[0].locator,
        "Controller/Programs/Program[Main]/Routines/Routine[Logic]/RLLContent/Rung[0]"
    );
}

/// Top-level containers a controller may hold, in no particular order.
const CONTAINERS: &[&str] = &[
    "Tasks",
    "Programs",
    "Tags",
    "AddOnInstructionDefinitions",
    "Modules",
    "DataTypes",
    "CST",
    "WallClockTime",
];

fn is_schema_ordered(document: &Document, parent: &NodePath) -> bool {
    let node = document.node(parent).unwrap();
    let order = document.schema().child_order(node.label()).unwrap();
    let ranks: Vec<usize> = node
        .children()
        .iter()
        .filter_map(|c| order.iter().position(|l| l == c.label()))
        .collect();
    ranks.windows(2).all(|w| w[0] <= w[1])
}

proptest! {
    #[test]
    fn ordered_inserts_keep_schema_order(
        labels in Just(CONTAINERS.to_vec()).prop_shuffle(),
    ) {
        let mut document = bare_controller();
        let controller = document.controller().unwrap();
        for label in labels {
            document.insert_at(&controller, ElementNode::new(label)).unwrap();
            prop_assert!(is_schema_ordered(&document, &controller));
        }

        let report = Validator::new().run_category(&document, Category::Structure);
        prop_assert!(report.of_kind(FindingKind::OrderingViolation).next().is_none());
    }

    #[test]
    fn rollback_restores_any_insert_sequence(
        labels in Just(CONTAINERS.to_vec()).prop_shuffle(),
        keep in 0usize..8,
    ) {
        let mut document = bare_controller();
        let controller = document.controller().unwrap();
        for label in &labels[..keep] {
            document.insert_at(&controller, ElementNode::new(*label)).unwrap();
        }
        let before = document.to_xml().unwrap();

        let checkpoint = document.checkpoint();
        for label in &labels[keep..] {
            document.insert_at(&controller, ElementNode::new(*label)).unwrap();
        }
        document.rollback_to(checkpoint);
        prop_assert_eq!(document.to_xml().unwrap(), before);
    }

    #[test]
    fn dependencies_precede_dependents(
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..30),
        permutation in Just((0..12).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        // Edges only point from a higher to a lower index, so there is no cycle.
        let uses = |i: usize| -> Vec<String> {
            edges
                .iter()
                .filter(|(from, to)| *from == i && to < from)
                .map(|(_, to)| format!("T{to}"))
                .collect()
        };
        let types: Vec<TypeDefinition> = permutation
            .iter()
            .map(|&i| {
                let used = uses(i);
                let used: Vec<&str> = used.iter().map(String::as_str).collect();
                user_type(&format!("T{i}"), &used)
            })
            .collect();

        let order = resolve_insertion_order(&types).unwrap();
        prop_assert_eq!(order.len(), types.len());
        let position = |name: &str| order.iter().position(|t| t.name() == name).unwrap();
        for definition in &types {
            for dependency in definition.dependencies() {
                prop_assert!(position(dependency) < position(definition.name()));
            }
        }
    }
}
