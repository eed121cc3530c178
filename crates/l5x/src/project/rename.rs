//! Renaming entities and the references that follow them.

use log::{debug, info};

use l5x_core::{ElementNode, naming::validate_name};
use l5x_rung::Rung;

use super::{
    EntityKind, RoutineRef, TagScope, Transaction, aoi_path, program_path, routine_path,
    tag_path, task_path,
};
use crate::{
    document::{Document, NodePath},
    error::L5xError,
};

impl Transaction<'_> {
    /// Rename an entity.
    ///
    /// With `cascade` every reference that resolves to the entity is
    /// rewritten too:
    ///
    /// * tags: rung operands and alias targets wherever the tag is visible
    ///   and not shadowed by a program tag of the same name
    /// * data types: every `DataType` attribute naming the type
    /// * Add-On Instructions: `DataType` attributes and calls in rungs
    /// * programs: task schedule entries
    /// * routines: the program's main and fault routine pointers and jump
    ///   targets in its rungs
    /// * modules: `ParentModule` attributes and rung operands on the
    ///   module's I/O tags
    ///
    /// Without `cascade` only the name changes and validation reports the
    /// references left behind.
    ///
    /// # Errors
    ///
    /// Fails when the entity does not exist, the new name is invalid, or
    /// another entity of the same kind already has it. A rename that only
    /// changes case is always allowed.
    pub fn rename_entity(
        &mut self,
        kind: &EntityKind,
        old: &str,
        new: &str,
        cascade: bool,
    ) -> Result<(), L5xError> {
        validate_name(new)?;
        let path = entity_path(self.document, kind, old)?;
        if !old.eq_ignore_ascii_case(new) && entity_exists(self.document, kind, new) {
            return Err(L5xError::already_exists(kind.noun(), new));
        }
        // The stored spelling may differ in case from `old`.
        let old = self
            .document
            .require(&path)?
            .name()
            .unwrap_or(old)
            .to_string();

        self.document.set_attribute(&path, "Name", new)?;
        self.touch_path(&path);

        let rewritten = if cascade {
            match kind {
                EntityKind::Tag(scope) => self.cascade_tag(scope, &old, new)?,
                EntityKind::DataType => self.rewrite_type_references(&old, new)?,
                EntityKind::AddOnInstruction => {
                    let types = self.rewrite_type_references(&old, new)?;
                    types + self.rename_calls(&old, new)?
                }
                EntityKind::Program => self.rewrite_schedules(&old, new)?,
                EntityKind::Routine { program } => self.cascade_routine(program, &old, new)?,
                EntityKind::Task => 0,
                EntityKind::Module => self.cascade_module(&old, new)?,
            }
        } else {
            0
        };
        self.structure_changed();
        info!(kind:% = kind, old:% = old, new, references = rewritten; "Renamed entity");
        Ok(())
    }

    fn cascade_tag(&mut self, scope: &TagScope, old: &str, new: &str) -> Result<usize, L5xError> {
        let roots = self.visible_roots(scope, old)?;
        let rungs: Vec<NodePath> = self
            .reference_index()
            .rungs_referencing(old)
            .iter()
            .filter(|rung| roots.iter().any(|root| rung.starts_with(root)))
            .cloned()
            .collect();

        let mut rewritten = 0;
        for rung in &rungs {
            let schema = self.document.schema_handle();
            rewritten += self.rewrite_rung(rung, |r| {
                r.rename_operand_tags(&schema, |base| {
                    base.eq_ignore_ascii_case(old).then(|| new.to_string())
                })
            })?;
        }

        for root in &roots {
            for tag in self.document.descendant_paths(root, "Tag") {
                let renamed = self
                    .document
                    .node(&tag)
                    .and_then(|t| t.attribute("AliasFor"))
                    .and_then(|target| rename_alias_base(target, old, new));
                if let Some(target) = renamed {
                    self.document.set_attribute(&tag, "AliasFor", target)?;
                    rewritten += 1;
                }
            }
        }
        Ok(rewritten)
    }

    /// Subtrees in which a tag of `scope` named `name` is what the name
    /// resolves to.
    fn visible_roots(&self, scope: &TagScope, name: &str) -> Result<Vec<NodePath>, L5xError> {
        match scope {
            TagScope::Program(program) => Ok(vec![program_path(self.document, program)?]),
            TagScope::Controller => {
                let mut roots = Vec::new();
                if let Some(tags) = self.document.find_in_controller(&[("Tags", None)]) {
                    roots.push(tags);
                }
                let Some(programs) = self.document.find_in_controller(&[("Programs", None)]) else {
                    return Ok(roots);
                };
                for program in self.document.children_paths(&programs, "Program") {
                    let shadowed = self
                        .document
                        .find(&program, &[("Tags", None), ("Tag", Some(name))])
                        .is_some();
                    if !shadowed {
                        roots.push(program);
                    }
                }
                Ok(roots)
            }
        }
    }

    /// Point every `DataType` attribute naming `old` at `new`.
    fn rewrite_type_references(&mut self, old: &str, new: &str) -> Result<usize, L5xError> {
        let controller = self.controller()?;
        let paths = matching_paths(self.document, &controller, |node| {
            node.attribute("DataType")
                .is_some_and(|t| t.eq_ignore_ascii_case(old))
        });
        for path in &paths {
            self.document.set_attribute(path, "DataType", new)?;
            self.touch_path(path);
        }
        debug!(old, new, count = paths.len(); "Rewrote type references");
        Ok(paths.len())
    }

    fn rename_calls(&mut self, old: &str, new: &str) -> Result<usize, L5xError> {
        let controller = self.controller()?;
        let mut rewritten = 0;
        for rung in self.document.descendant_paths(&controller, "Rung") {
            rewritten += self.rewrite_rung(&rung, |r| r.rename_instructions(old, new))?;
        }
        Ok(rewritten)
    }

    fn rewrite_schedules(&mut self, old: &str, new: &str) -> Result<usize, L5xError> {
        let controller = self.controller()?;
        let entries: Vec<NodePath> = self
            .document
            .descendant_paths(&controller, "ScheduledProgram")
            .into_iter()
            .filter(|p| {
                self.document
                    .node(p)
                    .and_then(ElementNode::name)
                    .is_some_and(|n| n.eq_ignore_ascii_case(old))
            })
            .collect();
        for entry in &entries {
            self.document.set_attribute(entry, "Name", new)?;
        }
        Ok(entries.len())
    }

    fn cascade_routine(&mut self, program: &str, old: &str, new: &str) -> Result<usize, L5xError> {
        let program = program_path(self.document, program)?;
        let mut rewritten = 0;
        for pointer in ["MainRoutineName", "FaultRoutineName"] {
            let points_here = self
                .document
                .node(&program)
                .and_then(|p| p.attribute(pointer))
                .is_some_and(|r| r.eq_ignore_ascii_case(old));
            if points_here {
                self.document.set_attribute(&program, pointer, new)?;
                rewritten += 1;
            }
        }

        let schema = self.document.schema_handle();
        for rung in self.document.descendant_paths(&program, "Rung") {
            rewritten += self.rewrite_rung(&rung, |r| r.rename_routine_targets(&schema, old, new))?;
        }
        Ok(rewritten)
    }

    fn cascade_module(&mut self, old: &str, new: &str) -> Result<usize, L5xError> {
        let controller = self.controller()?;
        let children = matching_paths(self.document, &controller, |node| {
            node.label() == "Module"
                && node
                    .attribute("ParentModule")
                    .is_some_and(|p| p.eq_ignore_ascii_case(old))
        });
        for child in &children {
            self.document.set_attribute(child, "ParentModule", new)?;
        }

        let mut rewritten = children.len();
        for rung in self.document.descendant_paths(&controller, "Rung") {
            rewritten += self.rewrite_rung(&rung, |r| {
                r.rename_tags(|base| rename_module_prefix(base, old, new))
            })?;
        }
        for tag in self.document.descendant_paths(&controller, "Tag") {
            let renamed = self
                .document
                .node(&tag)
                .and_then(|t| t.attribute("AliasFor"))
                .and_then(|target| rename_module_prefix(target, old, new));
            if let Some(target) = renamed {
                self.document.set_attribute(&tag, "AliasFor", target)?;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    /// Apply `edit` to the parsed rung at `path` and store the result when
    /// it replaced anything. Rungs that do not parse are left alone.
    fn rewrite_rung(
        &mut self,
        path: &NodePath,
        edit: impl FnOnce(&mut Rung) -> usize,
    ) -> Result<usize, L5xError> {
        let Some(text_path) = self.document.find(path, &[("Text", None)]) else {
            return Ok(0);
        };
        let text = self.document.require(&text_path)?.text().unwrap_or_default();
        let mut rung = match l5x_rung::parse(text.trim()) {
            Ok(rung) => rung,
            Err(err) => {
                debug!(rung:% = self.document.describe(path), err:%; "Skipped unparseable rung");
                return Ok(0);
            }
        };
        let replaced = edit(&mut rung);
        if replaced > 0 {
            self.document.set_text(&text_path, rung.to_string())?;
            self.touch_path(path);
        }
        Ok(replaced)
    }
}

fn entity_path(document: &Document, kind: &EntityKind, name: &str) -> Result<NodePath, L5xError> {
    match kind {
        EntityKind::Tag(scope) => tag_path(document, scope, name),
        EntityKind::DataType => document
            .find_in_controller(&[("DataTypes", None), ("DataType", Some(name))])
            .ok_or_else(|| L5xError::not_found("data type", name)),
        EntityKind::AddOnInstruction => aoi_path(document, name),
        EntityKind::Program => program_path(document, name),
        EntityKind::Routine { program } => routine_path(document, &RoutineRef::program(program.as_str(), name)),
        EntityKind::Task => task_path(document, name),
        EntityKind::Module => document
            .find_in_controller(&[("Modules", None), ("Module", Some(name))])
            .ok_or_else(|| L5xError::not_found("module", name)),
    }
}

fn entity_exists(document: &Document, kind: &EntityKind, name: &str) -> bool {
    match kind {
        // Types and Add-On Instructions share one namespace.
        EntityKind::DataType | EntityKind::AddOnInstruction => {
            document.schema().is_predefined_type(name) || document.type_element_path(name).is_some()
        }
        kind => entity_path(document, kind, name).is_ok(),
    }
}

/// Paths of every node below `start` that `matches`, pre-order.
fn matching_paths(
    document: &Document,
    start: &NodePath,
    matches: impl Fn(&ElementNode) -> bool,
) -> Vec<NodePath> {
    fn walk(
        node: &ElementNode,
        path: &NodePath,
        matches: &dyn Fn(&ElementNode) -> bool,
        out: &mut Vec<NodePath>,
    ) {
        for (index, child) in node.children().iter().enumerate() {
            let child_path = path.child(index);
            if matches(child) {
                out.push(child_path.clone());
            }
            walk(child, &child_path, matches, out);
        }
    }

    let mut out = Vec::new();
    if let Some(node) = document.node(start) {
        walk(node, start, &matches, &mut out);
    }
    out
}

/// `target` with its base tag renamed, if the base is `old`.
fn rename_alias_base(target: &str, old: &str, new: &str) -> Option<String> {
    let end = target.find(['.', '[']).unwrap_or(target.len());
    let (base, rest) = target.split_at(end);
    base.eq_ignore_ascii_case(old).then(|| format!("{new}{rest}"))
}

/// `name` with a leading `old:` module prefix replaced.
fn rename_module_prefix(name: &str, old: &str, new: &str) -> Option<String> {
    let (module, rest) = name.split_once(':')?;
    module.eq_ignore_ascii_case(old).then(|| format!("{new}:{rest}"))
}
