//! Renaming inside rung text.
//!
//! Every rewrite works on the parsed tree, never on raw text, so a name is
//! only replaced where it is a whole operand base name. `Tag1` is never
//! touched inside `Tag10` or `My_Tag1`, and member and index suffixes are
//! kept as written.

use indexmap::IndexMap;
use l5x_core::schema::{ArgRole, SchemaTable};
use log::debug;

use crate::{
    ast::{Operand, Rung},
    error::ParseError,
    parse,
};

impl Rung {
    /// Replace tag base names in every argument position.
    ///
    /// `rename` gets each base name and returns the replacement, if any.
    /// Returns the number of names replaced.
    pub fn rename_tags(&mut self, rename: impl Fn(&str) -> Option<String>) -> usize {
        let mut replaced = 0;
        self.visit_instructions_mut(&mut |call| {
            for operand in &mut call.arguments {
                replaced += rename_operand(operand, &rename);
            }
        });
        replaced
    }

    /// Replace tag base names only where the catalog says the argument is a
    /// tag operand. Routine targets, labels and system names are left alone.
    pub fn rename_operand_tags(
        &mut self,
        schema: &SchemaTable,
        rename: impl Fn(&str) -> Option<String>,
    ) -> usize {
        let mut replaced = 0;
        self.visit_instructions_mut(&mut |call| {
            let spec = schema.instruction(&call.name);
            for (index, operand) in call.arguments.iter_mut().enumerate() {
                if spec.map_or(ArgRole::Operand, |spec| spec.role(index)) == ArgRole::Operand {
                    replaced += rename_operand(operand, &rename);
                }
            }
        });
        replaced
    }

    /// Rename an instruction, ignoring case. Used when an Add-On Instruction
    /// is renamed.
    pub fn rename_instructions(&mut self, old: &str, new: &str) -> usize {
        let mut replaced = 0;
        self.visit_instructions_mut(&mut |call| {
            if call.name.eq_ignore_ascii_case(old) {
                call.name = new.to_string();
                replaced += 1;
            }
        });
        replaced
    }

    /// Rename routine targets of `JSR`-style instructions, ignoring case.
    pub fn rename_routine_targets(&mut self, schema: &SchemaTable, old: &str, new: &str) -> usize {
        let mut replaced = 0;
        self.visit_instructions_mut(&mut |call| {
            let Some(spec) = schema.instruction(&call.name) else {
                return;
            };
            for (index, operand) in call.arguments.iter_mut().enumerate() {
                if spec.role(index) != ArgRole::Routine {
                    continue;
                }
                if let Operand::Tag(tag) = operand {
                    if tag.is_bare() && tag.base.eq_ignore_ascii_case(old) {
                        tag.base = new.to_string();
                        replaced += 1;
                    }
                }
            }
        });
        replaced
    }
}

fn rename_operand(operand: &mut Operand, rename: &impl Fn(&str) -> Option<String>) -> usize {
    let mut replaced = 0;
    if let Operand::Tag(tag) = operand {
        tag.visit_mut(&mut |tag| {
            if let Some(new) = rename(&tag.base) {
                tag.base = new;
                replaced += 1;
            }
        });
    }
    replaced
}

/// Rewrite tag base names in rung text.
///
/// Only operands whose base name equals a key of `mapping` exactly are
/// replaced. The result is the canonical text of the rewritten rung. Text
/// that does not parse fails with the parser's error.
///
/// # Example
///
/// ```
/// # use indexmap::IndexMap;
/// let mapping = IndexMap::from([("Tag1".to_string(), "Pump1".to_string())]);
/// let text = l5x_rung::substitute("XIC(Tag1)XIC(Tag10)OTE(Tag1.Run);", &mapping).unwrap();
/// assert_eq!(text, "XIC(Pump1)XIC(Tag10)OTE(Pump1.Run);");
/// ```
pub fn substitute(text: &str, mapping: &IndexMap<String, String>) -> Result<String, ParseError> {
    let mut rung = parse(text)?;
    let replaced = rung.rename_tags(|base| mapping.get(base).cloned());
    debug!(replaced; "Substituted tag references");
    Ok(rung.to_string())
}
