//! Rung text parses and calls instructions with the right arity.

use super::{FindingKind, Findings, Severity, scope::names_in};
use crate::document::{Document, NodePath};

pub(super) fn check(document: &Document, unknown_instruction: Severity, findings: &mut Findings) {
    let Ok(controller) = document.controller() else {
        return;
    };
    let aois: Vec<String> = document
        .node(&controller)
        .map(|c| {
            names_in(c, "AddOnInstructionDefinitions", "AddOnInstructionDefinition")
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    for path in document.descendant_paths(&controller, "Rung") {
        check_rung(document, &path, &aois, unknown_instruction, findings);
    }
}

fn check_rung(
    document: &Document,
    path: &NodePath,
    aois: &[String],
    unknown_instruction: Severity,
    findings: &mut Findings,
) {
    let text = document
        .node(path)
        .and_then(|r| r.child_text("Text"))
        .unwrap_or_default();
    let rung = match l5x_rung::parse(text.trim()) {
        Ok(rung) => rung,
        Err(err) => {
            findings.error(FindingKind::RungSyntax(err.kind()), document.describe(path), err.to_string());
            return;
        }
    };

    for call in rung.instructions() {
        match document.schema().instruction(&call.name) {
            Some(spec) if !spec.accepts(call.arguments.len()) => findings.error(
                FindingKind::ArityMismatch,
                document.describe(path),
                format!(
                    "`{}` takes {} argument(s), found {}",
                    spec.name(),
                    spec.arity_text(),
                    call.arguments.len()
                ),
            ),
            Some(_) => {}
            None if aois.iter().any(|a| a.eq_ignore_ascii_case(&call.name)) => {}
            None => findings.push(
                unknown_instruction,
                FindingKind::UnknownInstruction,
                document.describe(path),
                format!("instruction `{}` is not known", call.name),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use l5x_core::ElementNode;
    use l5x_rung::SyntaxKind;

    use super::*;
    use crate::document::tests::sample;
    use crate::validate::{Category, Validator};

    const RUNG_LOCATOR: &str =
        "Controller/Programs/Program[MainProgram]/Routines/Routine[MainRoutine]/RLLContent/Rung[0]";

    fn with_rung_text(text: &str) -> Document {
        let mut document = sample();
        let rung = document.descendant_paths(&NodePath::root(), "Rung")[0].clone();
        let text_path = document.find(&rung, &[("Text", None)]).unwrap();
        document.set_text(&text_path, text).unwrap();
        document
    }

    #[test]
    fn test_missing_terminator_names_the_rung() {
        let document = with_rung_text("XIC(Start)MOV(5,Speed)");
        let report = Validator::new().run_category(&document, Category::Rungs);
        assert_eq!(report.len(), 1, "{report}");
        let finding = &report.findings()[0];
        assert_eq!(finding.kind, FindingKind::RungSyntax(SyntaxKind::MissingTerminator));
        assert_eq!(finding.locator, RUNG_LOCATOR);
        assert!(finding.is_error());
    }

    #[test]
    fn test_arity_mismatch() {
        let document = with_rung_text("XIC(Start)MOV(Speed);");
        let report = Validator::new().run_category(&document, Category::Rungs);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::ArityMismatch);
        assert!(report.findings()[0].message.contains("`MOV` takes 2"));
    }

    #[test]
    fn test_unknown_instruction_severity_is_configurable() {
        let document = with_rung_text("XIC(Start)Blend(Speed);");
        let report = Validator::new().run_category(&document, Category::Rungs);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].severity, Severity::Warning);

        let report = Validator::new()
            .with_unknown_instruction_severity(Severity::Error)
            .run_category(&document, Category::Rungs);
        assert!(report.has_errors());
    }

    #[test]
    fn test_add_on_instruction_calls_are_known() {
        let mut document = with_rung_text("XIC(Start)Blend(Speed);");
        let controller = document.controller().unwrap();
        let container = document
            .ensure_container(&controller, "AddOnInstructionDefinitions")
            .unwrap();
        document
            .insert_at(
                &container,
                ElementNode::new("AddOnInstructionDefinition").with_attribute("Name", "Blend"),
            )
            .unwrap();

        let report = Validator::new().run_category(&document, Category::Rungs);
        assert!(report.is_empty(), "{report}");
    }
}
