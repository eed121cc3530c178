//! Tag names used by a rung.

use indexmap::IndexMap;
use l5x_core::schema::{ArgRole, SchemaTable};

use crate::ast::{Operand, Rung};

/// Names used by a rung, grouped by how the instructions use them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReferences {
    /// Base names of tag operands.
    pub tags: Vec<String>,
    /// Routine names passed to `JSR`, `FOR` and the like.
    pub routines: Vec<String>,
}

/// Distinct names ignoring case, keeping the first spelling seen.
#[derive(Default)]
struct DistinctNames(IndexMap<String, String>);

impl DistinctNames {
    fn insert(&mut self, name: &str) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| name.to_string());
    }

    fn insert_operand(&mut self, operand: &Operand) {
        if let Operand::Tag(tag) = operand {
            for tag in tag.tags() {
                self.insert(&tag.base);
            }
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0.into_values().collect()
    }
}

impl Rung {
    /// Distinct base names of every tag operand, in order of first use.
    ///
    /// Tags used as indexes (`Table[Row]`) are included. Names differing only
    /// in case count once.
    pub fn references(&self) -> Vec<String> {
        let mut names = DistinctNames::default();
        for call in self.instructions() {
            for operand in &call.arguments {
                names.insert_operand(operand);
            }
        }
        names.into_vec()
    }

    /// Tag and routine names, honouring the argument roles in the catalog.
    ///
    /// Jump labels and system object names are not tags and are left out.
    /// Unknown instructions, such as Add-On Instruction calls, take tag
    /// operands in every position.
    pub fn tag_references(&self, schema: &SchemaTable) -> TagReferences {
        let mut tags = DistinctNames::default();
        let mut routines = DistinctNames::default();

        for call in self.instructions() {
            let spec = schema.instruction(&call.name);
            for (index, operand) in call.arguments.iter().enumerate() {
                let role = spec.map_or(ArgRole::Operand, |spec| spec.role(index));
                match (role, operand) {
                    (ArgRole::Operand, _) => tags.insert_operand(operand),
                    (ArgRole::Routine, Operand::Tag(tag)) => routines.insert(&tag.base),
                    _ => {}
                }
            }
        }

        TagReferences {
            tags: tags.into_vec(),
            routines: routines.into_vec(),
        }
    }
}
