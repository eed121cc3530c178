//! Task types and program schedules.

use std::collections::HashMap;

use l5x_core::ElementNode;

use super::{FindingKind, Findings, scope::names_in};
use crate::document::Document;

/// Accepted values of a task's `Type` attribute.
pub(crate) const TASK_TYPES: &[&str] = &["CONTINUOUS", "PERIODIC", "EVENT"];

pub(super) fn check(document: &Document, findings: &mut Findings) {
    let Ok(controller_path) = document.controller() else {
        return;
    };
    let Some(controller) = document.node(&controller_path) else {
        return;
    };
    let task_paths = document
        .find(&controller_path, &[("Tasks", None)])
        .map(|tasks| document.children_paths(&tasks, "Task"))
        .unwrap_or_default();
    if task_paths.is_empty() {
        findings.error(
            FindingKind::NoTasks,
            document.describe(&controller_path),
            "project defines no task",
        );
        return;
    }

    let programs = names_in(controller, "Programs", "Program");
    let mut continuous: Option<String> = None;
    let mut scheduled: HashMap<String, String> = HashMap::new();

    for path in &task_paths {
        let Some(task) = document.node(path) else {
            continue;
        };
        let name = task.name().unwrap_or_default();
        let kind = task.attribute("Type").unwrap_or_default();

        if !TASK_TYPES.iter().any(|t| t.eq_ignore_ascii_case(kind)) {
            findings.error(
                FindingKind::InvalidTaskType,
                document.describe(path),
                format!("task type `{kind}` is not one of {}", TASK_TYPES.join(", ")),
            );
        } else if kind.eq_ignore_ascii_case("CONTINUOUS") {
            match &continuous {
                Some(first) => findings.error(
                    FindingKind::MultipleContinuous,
                    document.describe(path),
                    format!("`{first}` is already the continuous task"),
                ),
                None => continuous = Some(name.to_string()),
            }
        }

        for program in scheduled_programs(task) {
            if !programs.iter().any(|p| p.eq_ignore_ascii_case(program)) {
                findings.error(
                    FindingKind::UndefinedProgram,
                    document.describe(path),
                    format!("scheduled program `{program}` does not exist"),
                );
                continue;
            }
            match scheduled.get(&program.to_ascii_lowercase()) {
                Some(owner) => findings.error(
                    FindingKind::DuplicateSchedule,
                    document.describe(path),
                    format!("program `{program}` is already scheduled in `{owner}`"),
                ),
                None => {
                    scheduled.insert(program.to_ascii_lowercase(), name.to_string());
                }
            }
        }
    }
}

fn scheduled_programs(task: &ElementNode) -> impl Iterator<Item = &str> {
    task.child("ScheduledPrograms")
        .into_iter()
        .flat_map(|s| s.children_labeled("ScheduledProgram"))
        .filter_map(ElementNode::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::sample;
    use crate::validate::{Category, Validator};

    fn add_task(document: &mut Document, name: &str, kind: &str, programs: &[&str]) {
        let tasks = document.find_in_controller(&[("Tasks", None)]).unwrap();
        let task = ElementNode::new("Task")
            .with_attribute("Name", name)
            .with_attribute("Type", kind)
            .with_child(ElementNode::new("ScheduledPrograms").with_children(
                programs
                    .iter()
                    .map(|p| ElementNode::new("ScheduledProgram").with_attribute("Name", *p)),
            ));
        document.insert_at(&tasks, task).unwrap();
    }

    fn kinds(document: &Document) -> Vec<FindingKind> {
        Validator::new()
            .run_category(document, Category::Tasks)
            .findings()
            .iter()
            .map(|f| f.kind)
            .collect()
    }

    #[test]
    fn test_missing_tasks_is_a_single_finding() {
        let mut document = sample();
        let tasks = document.find_in_controller(&[("Tasks", None)]).unwrap();
        document.remove_subtree(&tasks).unwrap();

        let report = Validator::new().run(&document);
        assert_eq!(report.len(), 1, "{report}");
        assert_eq!(report.findings()[0].kind, FindingKind::NoTasks);
        assert_eq!(report.findings()[0].locator, "Controller");
    }

    #[test]
    fn test_second_continuous_task() {
        let mut document = sample();
        add_task(&mut document, "Other", "continuous", &[]);
        assert_eq!(kinds(&document), [FindingKind::MultipleContinuous]);
    }

    #[test]
    fn test_schedule_errors() {
        let mut document = sample();
        add_task(&mut document, "Fast", "PERIODIC", &["MainProgram", "Ghost"]);
        add_task(&mut document, "Odd", "SOMETIMES", &[]);
        assert_eq!(
            kinds(&document),
            [
                FindingKind::DuplicateSchedule,
                FindingKind::UndefinedProgram,
                FindingKind::InvalidTaskType,
            ]
        );
    }
}
