//! User-defined data types.

use std::collections::HashSet;

use log::info;

use l5x_core::naming::validate_name;

use super::Transaction;
use crate::{
    document::{DependencyError, TypeDecl, check_cdata, datatype_element, resolve_insertion_order},
    error::L5xError,
};

impl Transaction<'_> {
    /// Declare a user-defined structure.
    ///
    /// `BOOL` members are packed into hidden backing `SINT`s. Every member
    /// type must already exist.
    ///
    /// # Errors
    ///
    /// Fails on invalid or duplicate names, on a type that names itself, and
    /// on unknown member types.
    pub fn create_type(&mut self, decl: &TypeDecl) -> Result<(), L5xError> {
        validate_name(&decl.name)?;
        let mut seen = HashSet::new();
        for member in &decl.members {
            validate_name(&member.name)?;
            if !seen.insert(member.name.to_ascii_lowercase()) {
                return Err(L5xError::already_exists(
                    "member",
                    format!("{}.{}", decl.name, member.name),
                ));
            }
        }
        let schema = self.document.schema();
        if schema.is_predefined_type(&decl.name) || self.document.type_element_path(&decl.name).is_some() {
            return Err(L5xError::already_exists("data type", decl.name.as_str()));
        }

        for member in &decl.members {
            if member.data_type.eq_ignore_ascii_case(&decl.name) {
                return Err(DependencyError::CyclicDependency {
                    cycle: vec![decl.name.clone(), decl.name.clone()],
                }
                .into());
            }
            let known = schema.is_known_type(&member.data_type)
                || self.document.type_element_path(&member.data_type).is_some();
            if !known {
                return Err(DependencyError::UndefinedType {
                    name: member.data_type.clone(),
                    used_by: decl.name.clone(),
                }
                .into());
            }
        }
        if let Some(description) = &decl.description {
            check_cdata("Description", description)?;
        }

        let element = datatype_element(&decl.to_definition());
        let controller = self.controller()?;
        let container = self.document.ensure_container(&controller, "DataTypes")?;
        self.document.insert_at(&container, element)?;
        self.structure_changed();
        info!(data_type = decl.name, members = decl.members.len(); "Created data type");
        Ok(())
    }

    /// Declare several types at once, in dependency order.
    ///
    /// Types may use each other in any order of declaration.
    pub fn create_types(&mut self, decls: &[TypeDecl]) -> Result<(), L5xError> {
        let definitions: Vec<_> = decls.iter().map(TypeDecl::to_definition).collect();
        let order = resolve_insertion_order(&definitions)?;
        for definition in order {
            let Some(decl) = decls
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(definition.name()))
            else {
                continue;
            };
            self.create_type(decl)?;
        }
        Ok(())
    }
}
