//! Programs, routines, tasks and the rungs and lines inside routines.

use indexmap::IndexMap;
use log::{debug, info};

use l5x_core::{ElementNode, naming::validate_name};

use super::{
    IndexRebaser, RoutineKind, RoutineOwner, RoutineRef, TaskType, Transaction, aoi_path,
    program_path, routine_path, task_path,
};
use crate::{
    document::{DocumentError, NodePath, check_cdata},
    error::L5xError,
};

const DEFAULT_PRIORITY: u8 = 10;
const DEFAULT_WATCHDOG_MS: u32 = 500;

impl Transaction<'_> {
    /// Create a program with empty `Tags` and `Routines` containers.
    ///
    /// With `main_routine` an empty ladder routine of that name is created
    /// and set as the program's main routine.
    pub fn create_program(
        &mut self,
        name: &str,
        main_routine: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), L5xError> {
        validate_name(name)?;
        if let Some(routine) = main_routine {
            validate_name(routine)?;
        }
        if program_path(self.document, name).is_ok() {
            return Err(L5xError::already_exists("program", name));
        }

        let mut program = ElementNode::new("Program")
            .with_attribute("Name", name)
            .with_attribute("TestEdits", "false");
        if let Some(routine) = main_routine {
            program = program.with_attribute("MainRoutineName", routine);
        }
        program = program
            .with_attribute("Disabled", "false")
            .with_attribute("UseAsFolder", "false");
        if let Some(description) = description {
            check_cdata("Description", description)?;
            program = program.with_child(ElementNode::new("Description").with_text(description));
        }
        let routines = match main_routine {
            Some(routine) => ElementNode::new("Routines")
                .with_child(routine_element(routine, RoutineKind::Rll, None)),
            None => ElementNode::new("Routines"),
        };
        program = program
            .with_child(ElementNode::new("Tags"))
            .with_child(routines);

        let controller = self.controller()?;
        let container = self.document.ensure_container(&controller, "Programs")?;
        self.document.insert_at(&container, program)?;
        self.structure_changed();
        info!(program = name; "Created program");
        Ok(())
    }

    /// Delete a program and drop it from every task schedule.
    pub fn delete_program(&mut self, name: &str) -> Result<(), L5xError> {
        let path = program_path(self.document, name)?;
        self.document.remove_subtree(&path)?;
        let prefix = format!("program[{}]/", name.to_ascii_lowercase());
        self.rebasers.retain(|key, _| !key.starts_with(&prefix));
        self.structure_changed();
        info!(program = name; "Deleted program");
        Ok(())
    }

    /// Create an empty routine in a program or an Add-On Instruction.
    pub fn create_routine(
        &mut self,
        routine: &RoutineRef,
        kind: RoutineKind,
        description: Option<&str>,
    ) -> Result<(), L5xError> {
        validate_name(&routine.name)?;
        if routine_path(self.document, routine).is_ok() {
            return Err(L5xError::already_exists("routine", routine.to_string()));
        }
        if let Some(description) = description {
            check_cdata("Description", description)?;
        }
        let owner = match &routine.owner {
            RoutineOwner::Program(program) => program_path(self.document, program)?,
            RoutineOwner::AddOnInstruction(aoi) => aoi_path(self.document, aoi)?,
        };

        let container = self.document.ensure_container(&owner, "Routines")?;
        let path = self
            .document
            .insert_at(&container, routine_element(&routine.name, kind, description))?;
        self.touch_path(&path);
        self.structure_changed();
        info!(routine:% = routine, kind = kind.as_str(); "Created routine");
        Ok(())
    }

    /// Delete a routine. A program's main or fault routine pointer to it is
    /// cleared.
    pub fn delete_routine(&mut self, routine: &RoutineRef) -> Result<(), L5xError> {
        let path = routine_path(self.document, routine)?;
        self.touch_path(&path);
        self.document.remove_subtree(&path)?;
        self.rebasers.remove(&routine.key());
        self.structure_changed();
        info!(routine:% = routine; "Deleted routine");
        Ok(())
    }

    /// Create a task with no scheduled programs.
    pub fn create_task(&mut self, name: &str, task_type: TaskType) -> Result<(), L5xError> {
        validate_name(name)?;
        if task_path(self.document, name).is_ok() {
            return Err(L5xError::already_exists("task", name));
        }

        let mut task = ElementNode::new("Task")
            .with_attribute("Name", name)
            .with_attribute("Type", task_type.as_str());
        if let TaskType::Periodic { rate_ms } = task_type {
            if rate_ms == 0 {
                return Err(L5xError::InvalidArgument(format!(
                    "periodic task `{name}` needs a rate above zero"
                )));
            }
            task = task.with_attribute("Rate", rate_ms.to_string());
        }
        task = task
            .with_attribute("Priority", DEFAULT_PRIORITY.to_string())
            .with_attribute("Watchdog", DEFAULT_WATCHDOG_MS.to_string())
            .with_attribute("DisableUpdateOutputs", "false")
            .with_attribute("InhibitTask", "false");

        let controller = self.controller()?;
        let container = self.document.ensure_container(&controller, "Tasks")?;
        self.document.insert_at(&container, task)?;
        self.structure_changed();
        info!(task = name, kind = task_type.as_str(); "Created task");
        Ok(())
    }

    /// Add a program to a task's schedule. Scheduling it twice in the same
    /// task does nothing.
    pub fn schedule_program(&mut self, task: &str, program: &str) -> Result<(), L5xError> {
        let program_name = self
            .document
            .require(&program_path(self.document, program)?)?
            .name()
            .unwrap_or(program)
            .to_string();
        let task_path = task_path(self.document, task)?;
        if self
            .document
            .find(&task_path, &[("ScheduledPrograms", None), ("ScheduledProgram", Some(program))])
            .is_some()
        {
            return Ok(());
        }

        let schedule = self.document.ensure_container(&task_path, "ScheduledPrograms")?;
        let entry = ElementNode::new("ScheduledProgram").with_attribute("Name", program_name.as_str());
        self.document.insert_at(&schedule, entry)?;
        self.structure_changed();
        info!(task, program:% = program_name; "Scheduled program");
        Ok(())
    }

    /// Remove a program from a task's schedule, if it is there.
    pub fn unschedule_program(&mut self, task: &str, program: &str) -> Result<(), L5xError> {
        let task_path = task_path(self.document, task)?;
        let Some(entry) = self
            .document
            .find(&task_path, &[("ScheduledPrograms", None), ("ScheduledProgram", Some(program))])
        else {
            return Ok(());
        };
        self.document.remove_subtree(&entry)?;
        self.structure_changed();
        info!(task, program; "Unscheduled program");
        Ok(())
    }

    /// Insert a rung into a ladder routine and return its current position.
    ///
    /// `position` counts rungs as they were when the transaction started.
    /// Without one the rung is appended. The text must parse and is stored
    /// in canonical form.
    pub fn add_rung(
        &mut self,
        routine: &RoutineRef,
        text: &str,
        comment: Option<&str>,
        position: Option<usize>,
    ) -> Result<usize, L5xError> {
        let text = canonical_rung(text)?;
        if let Some(comment) = comment {
            check_cdata("Comment", comment)?;
        }
        let content = self.rll_content(routine)?;
        let count = self.document.children_paths(&content, "Rung").len();

        let rebaser = self.rebaser(routine);
        let start_count = rebaser.start_count(count);
        let start = position.unwrap_or(start_count);
        if start > start_count {
            return Err(DocumentError::InvalidOrdinal {
                label: "Rung".to_string(),
                ordinal: start,
                count: start_count,
            }
            .into());
        }
        let index = rebaser.insert_position(start);

        let path = self
            .document
            .insert_ordinal(&content, rung_element(&text, comment), index)?;
        self.rebaser(routine).record_insert(start);
        self.renumber(&content, "Rung")?;
        self.touch_path(&path);
        self.structure_changed();
        info!(routine:% = routine, position = start, index; "Added rung");
        Ok(index)
    }

    /// Change a rung's text, comment, or both.
    ///
    /// An empty comment removes the comment. `index` counts rungs as they
    /// were when the transaction started.
    pub fn modify_rung(
        &mut self,
        routine: &RoutineRef,
        index: usize,
        text: Option<&str>,
        comment: Option<&str>,
    ) -> Result<(), L5xError> {
        let text = text.map(canonical_rung).transpose()?;
        if let Some(comment) = comment {
            check_cdata("Comment", comment)?;
        }
        let rung = self.rung_path(routine, index)?;

        if let Some(text) = text {
            match self.document.find(&rung, &[("Text", None)]) {
                Some(path) => self.document.set_text(&path, text)?,
                None => {
                    self.document
                        .insert_at(&rung, ElementNode::new("Text").with_text(text))?;
                }
            }
        }
        if let Some(comment) = comment {
            let existing = self.document.find(&rung, &[("Comment", None)]);
            match (existing, comment.is_empty()) {
                (Some(path), true) => {
                    self.document.remove_subtree(&path)?;
                }
                (Some(path), false) => self.document.set_text(&path, comment)?,
                (None, true) => {}
                (None, false) => {
                    self.document
                        .insert_at(&rung, ElementNode::new("Comment").with_text(comment))?;
                }
            }
        }
        self.touch_path(&rung);
        self.structure_changed();
        info!(routine:% = routine, index; "Modified rung");
        Ok(())
    }

    /// Delete a rung. `index` counts rungs as they were when the transaction
    /// started.
    pub fn delete_rung(&mut self, routine: &RoutineRef, index: usize) -> Result<(), L5xError> {
        let rung = self.rung_path(routine, index)?;
        let content = self.rll_content(routine)?;
        self.touch_path(&rung);
        self.document.remove_subtree(&rung)?;
        self.rebaser(routine).record_delete(index);
        self.renumber(&content, "Rung")?;
        self.structure_changed();
        info!(routine:% = routine, index; "Deleted rung");
        Ok(())
    }

    /// Copy a rung right after itself, renaming tag operands through
    /// `mapping`. Returns the copy's current position.
    ///
    /// The copy keeps the original's comment unless `comment` is given.
    pub fn duplicate_rung_with_substitution(
        &mut self,
        routine: &RoutineRef,
        index: usize,
        mapping: &IndexMap<String, String>,
        comment: Option<&str>,
    ) -> Result<usize, L5xError> {
        let rung = self.rung_path(routine, index)?;
        let content = self.rll_content(routine)?;
        let source = self.document.require(&rung)?;
        let original = source.child_text("Text").unwrap_or_default().trim().to_string();
        let comment = comment
            .or_else(|| source.child_text("Comment"))
            .map(str::to_string);
        if let Some(comment) = &comment {
            check_cdata("Comment", comment)?;
        }

        let text = l5x_rung::substitute(&original, mapping)
            .map_err(|err| L5xError::new_rung_error(err, original.as_str()))?;
        let current = self.rebaser(routine).current(index)?;
        let path = self.document.insert_ordinal(
            &content,
            rung_element(&text, comment.as_deref()),
            current + 1,
        )?;
        self.rebaser(routine).record_insert(index + 1);
        self.renumber(&content, "Rung")?;
        self.touch_path(&path);
        self.structure_changed();
        info!(routine:% = routine, index, substitutions = mapping.len(); "Duplicated rung");
        Ok(current + 1)
    }

    /// Insert a line into a structured text routine. Without a `position`
    /// the line is appended. Returns the line's position.
    pub fn add_st_line(
        &mut self,
        routine: &RoutineRef,
        text: &str,
        position: Option<usize>,
    ) -> Result<usize, L5xError> {
        check_cdata("Line", text)?;
        let path = routine_path(self.document, routine)?;
        self.expect_kind(&path, routine, RoutineKind::St)?;
        let content = self.document.ensure_container(&path, "STContent")?;
        let count = self.document.children_paths(&content, "Line").len();
        let index = position.unwrap_or(count);

        let line = ElementNode::new("Line")
            .with_attribute("Number", "0")
            .with_text(text);
        let line = self.document.insert_ordinal(&content, line, index)?;
        self.renumber(&content, "Line")?;
        self.touch_path(&line);
        info!(routine:% = routine, index; "Added structured text line");
        Ok(index)
    }

    fn rebaser(&mut self, routine: &RoutineRef) -> &mut IndexRebaser {
        self.rebasers.entry(routine.key()).or_default()
    }

    fn expect_kind(
        &self,
        path: &NodePath,
        routine: &RoutineRef,
        kind: RoutineKind,
    ) -> Result<(), L5xError> {
        let actual = self.document.require(path)?.attribute("Type").unwrap_or_default();
        if !actual.eq_ignore_ascii_case(kind.as_str()) {
            return Err(L5xError::InvalidArgument(format!(
                "routine {routine} is {actual}, not {}",
                kind.as_str()
            )));
        }
        Ok(())
    }

    /// The `RLLContent` of a ladder routine, created when missing.
    fn rll_content(&mut self, routine: &RoutineRef) -> Result<NodePath, L5xError> {
        let path = routine_path(self.document, routine)?;
        self.expect_kind(&path, routine, RoutineKind::Rll)?;
        Ok(self.document.ensure_container(&path, "RLLContent")?)
    }

    /// Current path of the rung that was at `index` when the transaction
    /// started.
    fn rung_path(&mut self, routine: &RoutineRef, index: usize) -> Result<NodePath, L5xError> {
        let content = self.rll_content(routine)?;
        let current = self.rebaser(routine).current(index)?;
        let rungs = self.document.children_paths(&content, "Rung");
        rungs.get(current).cloned().ok_or_else(|| {
            DocumentError::InvalidOrdinal {
                label: "Rung".to_string(),
                ordinal: index,
                count: rungs.len(),
            }
            .into()
        })
    }

    /// Set `Number` on every `label` child to its position.
    fn renumber(&mut self, content: &NodePath, label: &str) -> Result<(), L5xError> {
        let children = self.document.children_paths(content, label);
        for (number, path) in children.iter().enumerate() {
            self.document.set_attribute(path, "Number", number.to_string())?;
        }
        debug!(label, count = children.len(); "Renumbered");
        Ok(())
    }
}

/// Trim rung text, close it with `;` and parse it into canonical form.
fn canonical_rung(text: &str) -> Result<String, L5xError> {
    let mut text = text.trim().to_string();
    if !text.ends_with(';') {
        text.push(';');
    }
    let rung = l5x_rung::parse(&text).map_err(|err| L5xError::new_rung_error(err, text.as_str()))?;
    Ok(rung.to_string())
}

fn rung_element(text: &str, comment: Option<&str>) -> ElementNode {
    let rung = ElementNode::new("Rung")
        .with_attribute("Number", "0")
        .with_attribute("Type", "N");
    let rung = match comment {
        Some(comment) if !comment.is_empty() => {
            rung.with_child(ElementNode::new("Comment").with_text(comment))
        }
        _ => rung,
    };
    rung.with_child(ElementNode::new("Text").with_text(text))
}

fn routine_element(name: &str, kind: RoutineKind, description: Option<&str>) -> ElementNode {
    let routine = ElementNode::new("Routine")
        .with_attribute("Name", name)
        .with_attribute("Type", kind.as_str());
    let routine = match description {
        Some(description) => routine.with_child(ElementNode::new("Description").with_text(description)),
        None => routine,
    };
    routine.with_child(ElementNode::new(kind.content_label()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::tests::sample, project::Project};

    fn main_routine() -> RoutineRef {
        RoutineRef::program("MainProgram", "MainRoutine")
    }

    fn rung_texts(project: &Project, routine: &RoutineRef) -> Vec<String> {
        let document = project.document();
        let path = routine_path(document, routine).unwrap();
        document
            .descendant_paths(&path, "Rung")
            .iter()
            .filter_map(|p| document.node(p))
            .map(|r| r.child_text("Text").unwrap_or_default().trim().to_string())
            .collect()
    }

    fn rung_numbers(project: &Project, routine: &RoutineRef) -> Vec<String> {
        let document = project.document();
        let path = routine_path(document, routine).unwrap();
        document
            .descendant_paths(&path, "Rung")
            .iter()
            .filter_map(|p| document.node(p).and_then(|r| r.attribute("Number")))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_add_rung_appends_and_inserts() {
        let mut project = Project::new(sample());
        let routine = main_routine();
        let last = project
            .add_rung(&routine, " OTE(Start) ", Some("Latch"), None)
            .unwrap();
        assert_eq!(last, 1);
        let first = project.add_rung(&routine, "NOP();", None, Some(0)).unwrap();
        assert_eq!(first, 0);
        assert_eq!(
            rung_texts(&project, &routine),
            ["NOP();", "XIC(Start)MOV(5,Speed);", "OTE(Start);"]
        );
        assert_eq!(rung_numbers(&project, &routine), ["0", "1", "2"]);
    }

    #[test]
    fn test_add_rung_rejects_bad_text_and_position() {
        let mut project = Project::new(sample());
        let routine = main_routine();
        let err = project.add_rung(&routine, "XIC(Start", None, None).unwrap_err();
        assert!(matches!(err, L5xError::Rung { .. }));

        let err = project
            .add_rung(&routine, "NOP();", None, Some(5))
            .unwrap_err();
        assert!(matches!(
            err,
            L5xError::Document(DocumentError::InvalidOrdinal { ordinal: 5, count: 1, .. })
        ));
    }

    #[test]
    fn test_batch_positions_refer_to_the_start() {
        let mut project = Project::new(sample());
        let routine = main_routine();
        project
            .transaction(|tx| {
                tx.add_rung(&routine, "OTE(Start);", None, None)?;
                // Start positions: 0 = MOV rung, 1 = end.
                tx.add_rung(&routine, "NOP();", None, Some(0))?;
                tx.modify_rung(&routine, 0, Some("XIC(Start)MOV(7,Speed);"), Some("Seven"))?;
                tx.add_rung(&routine, "AFI();", None, Some(1))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            rung_texts(&project, &routine),
            ["NOP();", "XIC(Start)MOV(7,Speed);", "OTE(Start);", "AFI();"]
        );
    }

    #[test]
    fn test_deleted_rung_cannot_be_addressed() {
        let mut project = Project::new(sample());
        let routine = main_routine();
        let err = project
            .transaction(|tx| {
                tx.delete_rung(&routine, 0)?;
                tx.modify_rung(&routine, 0, Some("NOP();"), None)
            })
            .unwrap_err();
        assert!(matches!(err, L5xError::RungDeleted { index: 0 }));
        assert_eq!(rung_texts(&project, &routine).len(), 1);
    }

    #[test]
    fn test_duplicate_with_substitution() {
        let mut project = Project::new(sample());
        let routine = main_routine();
        project
            .create_tag(
                &crate::project::TagScope::Controller,
                "Stop",
                "BOOL",
                &l5x_core::Dimensions::scalar(),
                None,
                &crate::project::TagOptions::default(),
            )
            .unwrap();
        let mapping = IndexMap::from([("Start".to_string(), "Stop".to_string())]);
        let copy = project
            .duplicate_rung_with_substitution(&routine, 0, &mapping, Some("Stop copy"))
            .unwrap();
        assert_eq!(copy, 1);
        assert_eq!(
            rung_texts(&project, &routine),
            ["XIC(Start)MOV(5,Speed);", "XIC(Stop)MOV(5,Speed);"]
        );
    }

    #[test]
    fn test_modify_comment_add_and_remove() {
        let mut project = Project::new(sample());
        let routine = main_routine();
        project
            .modify_rung(&routine, 0, None, Some("Speed setpoint"))
            .unwrap();
        let document = project.document();
        let rung = document.descendant_paths(&NodePath::root(), "Rung")[0].clone();
        let node = document.node(&rung).unwrap();
        assert_eq!(node.children()[0].label(), "Comment");
        assert_eq!(node.child_text("Comment"), Some("Speed setpoint"));

        project.modify_rung(&routine, 0, None, Some("")).unwrap();
        let document = project.document();
        let rung = document.descendant_paths(&NodePath::root(), "Rung")[0].clone();
        assert!(document.node(&rung).unwrap().child("Comment").is_none());
    }

    #[test]
    fn test_program_routine_and_task_lifecycle() {
        let mut project = Project::new(sample());
        project
            .transaction(|tx| {
                tx.create_program("Filling", Some("Main"), Some("Bottle filler"))?;
                tx.create_routine(&RoutineRef::program("Filling", "Calc"), RoutineKind::St, None)?;
                tx.add_st_line(&RoutineRef::program("Filling", "Calc"), "Level := Level + 1;", None)?;
                tx.create_task("Fast", TaskType::Periodic { rate_ms: 10 })?;
                tx.schedule_program("Fast", "filling")?;
                tx.schedule_program("Fast", "Filling")
            })
            .unwrap();

        let document = project.document();
        let task = task_path(document, "Fast").unwrap();
        let node = document.node(&task).unwrap();
        assert_eq!(node.attribute("Rate"), Some("10"));
        assert_eq!(
            node.child("ScheduledPrograms").unwrap().children().len(),
            1
        );
        let program = program_path(document, "Filling").unwrap();
        assert_eq!(
            document.node(&program).unwrap().attribute("MainRoutineName"),
            Some("Main")
        );

        project.unschedule_program("Fast", "Filling").unwrap();
        project.delete_program("Filling").unwrap();
        assert!(program_path(project.document(), "Filling").is_err());
    }

    #[test]
    fn test_rung_in_st_routine_is_rejected() {
        let mut project = Project::new(sample());
        let calc = RoutineRef::program("MainProgram", "Calc");
        project.create_routine(&calc, RoutineKind::St, None).unwrap();
        let err = project.add_rung(&calc, "NOP();", None, None).unwrap_err();
        assert!(matches!(err, L5xError::InvalidArgument(_)));
        let err = project.schedule_program("MainTask", "Missing").unwrap_err();
        assert!(matches!(err, L5xError::NotFound { kind: "program", .. }));
    }
}
