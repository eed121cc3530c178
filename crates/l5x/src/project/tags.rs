//! Tag operations.

use log::{info, warn};

use l5x_core::{BaseKind, Dimensions, ElementNode, Value, naming::validate_name};

use super::{TagOptions, TagScope, Transaction, scope_path, tag_path};
use crate::{
    codec::{self, Shape},
    document::{DependencyError, Document, NodePath, check_cdata},
    error::L5xError,
};

impl Transaction<'_> {
    /// Declare a base tag.
    ///
    /// The tag holds `value` laid over the zero value of its type, so a
    /// structure value may name only some members. Without a value the tag
    /// starts at zero. Tags of opaque and module-defined types get no data.
    ///
    /// # Errors
    ///
    /// Fails on an invalid or taken name, an unknown type, or a value that
    /// does not fit the type.
    pub fn create_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        data_type: &str,
        dims: &Dimensions,
        value: Option<&Value>,
        options: &TagOptions,
    ) -> Result<(), L5xError> {
        validate_name(name)?;
        if tag_path(self.document, scope, name).is_ok() {
            return Err(L5xError::already_exists("tag", format!("{scope}/{name}")));
        }
        let schema = self.document.schema();
        if !schema.is_known_type(data_type) && self.document.type_element_path(data_type).is_none() {
            return Err(DependencyError::UndefinedType {
                name: data_type.to_string(),
                used_by: name.to_string(),
            }
            .into());
        }

        let mut tag = ElementNode::new("Tag")
            .with_attribute("Name", name)
            .with_attribute("TagType", "Base")
            .with_attribute("DataType", data_type);
        if let Some(kind) = BaseKind::from_name(data_type) {
            let radix = options
                .radix
                .filter(|r| r.applies_to(kind))
                .unwrap_or_else(|| kind.default_radix());
            tag = tag.with_attribute("Radix", radix.name());
        }
        if !dims.is_scalar() {
            tag = tag.with_attribute("Dimensions", dims.to_tag_attribute());
        }
        let access = options
            .external_access
            .unwrap_or_else(|| self.editor.default_external_access());
        tag = tag
            .with_attribute("Constant", options.constant.to_string())
            .with_attribute("ExternalAccess", access.as_str());

        if let Some(description) = &options.description {
            check_cdata("Description", description)?;
            tag = tag.with_child(ElementNode::new("Description").with_text(description.as_str()));
        }

        let opaque = schema.is_opaque_type(data_type) || data_type.contains(':');
        if !opaque {
            let shape = codec::tag_shape(self.document, &tag)
                .map_err(|err| L5xError::new_codec_error(err, name))?;
            let mut initial = shape.zero_value();
            if let Some(value) = value {
                merge_value(&mut initial, value);
            }
            for data in data_blocks(&shape, &initial, name)? {
                tag = tag.with_child(data);
            }
        }

        let parent = scope_path(self.document, scope)?;
        let container = self.document.ensure_container(&parent, "Tags")?;
        self.document.insert_at(&container, tag)?;
        self.structure_changed();
        info!(tag = name, scope:% = scope, data_type; "Created tag");
        Ok(())
    }

    /// Declare an alias tag standing for `alias_for`, such as `Motor.Run` or
    /// `Local:1:I.Data.3`.
    pub fn create_alias_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        alias_for: &str,
        description: Option<&str>,
    ) -> Result<(), L5xError> {
        validate_name(name)?;
        if tag_path(self.document, scope, name).is_ok() {
            return Err(L5xError::already_exists("tag", format!("{scope}/{name}")));
        }
        if alias_for.trim().is_empty() {
            return Err(L5xError::InvalidArgument(format!(
                "alias `{name}` needs a target"
            )));
        }

        let access = self.editor.default_external_access();
        let mut tag = ElementNode::new("Tag")
            .with_attribute("Name", name)
            .with_attribute("TagType", "Alias")
            .with_attribute("AliasFor", alias_for.trim())
            .with_attribute("ExternalAccess", access.as_str());
        if let Some(description) = description {
            check_cdata("Description", description)?;
            tag = tag.with_child(ElementNode::new("Description").with_text(description));
        }

        let parent = scope_path(self.document, scope)?;
        let container = self.document.ensure_container(&parent, "Tags")?;
        self.document.insert_at(&container, tag)?;
        self.structure_changed();
        info!(tag = name, scope:% = scope, alias_for; "Created alias tag");
        Ok(())
    }

    /// Replace a tag's value, rewriting both stored forms.
    ///
    /// Structure values overlay the current value member by member, matching
    /// member names without regard to case. Arrays and scalars replace the
    /// current value whole.
    pub fn set_tag_value(
        &mut self,
        scope: &TagScope,
        name: &str,
        value: &Value,
    ) -> Result<(), L5xError> {
        let path = tag_path(self.document, scope, name)?;
        let tag = self.document.require(&path)?;
        let shape = value_shape(self.document, tag, name)?;
        let mut current = current_value(&shape, tag, name)?;
        merge_value(&mut current, value);
        let blocks = data_blocks(&shape, &current, name)?;
        self.write_data(&path, blocks)?;
        info!(tag = name, scope:% = scope; "Set tag value");
        Ok(())
    }

    /// Delete a tag.
    ///
    /// References to it are left in place and reported by validation.
    pub fn delete_tag(&mut self, scope: &TagScope, name: &str) -> Result<(), L5xError> {
        let path = tag_path(self.document, scope, name)?;
        let uses = self.reference_index().rungs_referencing(name).len();
        if uses > 0 {
            warn!(tag = name, scope:% = scope, rungs = uses; "Deleting a tag that rungs still use");
        }
        self.document.remove_subtree(&path)?;
        self.structure_changed();
        info!(tag = name, scope:% = scope; "Deleted tag");
        Ok(())
    }

    /// Copy a tag, value and all, into `target` under `new_name`.
    pub fn copy_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        target: &TagScope,
        new_name: &str,
    ) -> Result<(), L5xError> {
        validate_name(new_name)?;
        let path = tag_path(self.document, scope, name)?;
        if tag_path(self.document, target, new_name).is_ok() {
            return Err(L5xError::already_exists("tag", format!("{target}/{new_name}")));
        }
        let mut copy = self.document.require(&path)?.clone();
        copy.set_attribute("Name", new_name);

        let parent = scope_path(self.document, target)?;
        let container = self.document.ensure_container(&parent, "Tags")?;
        self.document.insert_at(&container, copy)?;
        self.structure_changed();
        info!(tag = name, copy = new_name, target:% = target; "Copied tag");
        Ok(())
    }

    /// Move a tag to another scope, keeping its name.
    pub fn move_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        target: &TagScope,
    ) -> Result<(), L5xError> {
        if scope == target {
            return Ok(());
        }
        let path = tag_path(self.document, scope, name)?;
        if tag_path(self.document, target, name).is_ok() {
            return Err(L5xError::already_exists("tag", format!("{target}/{name}")));
        }
        // Resolve the target before detaching so a missing program fails
        // without an edit.
        scope_path(self.document, target)?;

        let tag = self.document.remove_subtree(&path)?;
        let parent = scope_path(self.document, target)?;
        let container = self.document.ensure_container(&parent, "Tags")?;
        self.document.insert_at(&container, tag)?;
        self.structure_changed();
        info!(tag = name, from:% = scope, to:% = target; "Moved tag");
        Ok(())
    }
}

impl Transaction<'_> {
    /// Layout and value of every base tag with readable data.
    pub(super) fn snapshot_tags(&self) -> Vec<TagSnapshot> {
        base_tags(self.document)
            .into_iter()
            .filter_map(|(scope, name)| {
                let path = tag_path(self.document, &scope, &name).ok()?;
                let tag = self.document.node(&path)?;
                let shape = data_shape(self.document, tag)?;
                let value = current_value(&shape, tag, &name).ok()?;
                Some(TagSnapshot {
                    scope,
                    name,
                    shape,
                    value,
                })
            })
            .collect()
    }

    /// Rewrite the data of every snapshot tag whose layout has changed
    /// since, keeping the members that still fit. Returns how many tags
    /// were rewritten.
    pub(super) fn reshape_tags(
        &mut self,
        snapshots: Vec<TagSnapshot>,
    ) -> Result<usize, L5xError> {
        let mut rewritten = 0;
        for snapshot in snapshots {
            let Ok(path) = tag_path(self.document, &snapshot.scope, &snapshot.name) else {
                continue;
            };
            let tag = self.document.require(&path)?;
            // A type that no longer resolves is reported by validation.
            let Some(shape) = data_shape(self.document, tag) else {
                continue;
            };
            if shape == snapshot.shape {
                continue;
            }
            let value = codec::reshape(&shape, &snapshot.value);
            let blocks = match data_blocks(&shape, &value, &snapshot.name) {
                Ok(blocks) => blocks,
                Err(_) => data_blocks(&shape, &shape.zero_value(), &snapshot.name)?,
            };
            self.write_data(&path, blocks)?;
            info!(
                tag:% = snapshot.name,
                scope:% = snapshot.scope;
                "Re-encoded tag for its new layout"
            );
            rewritten += 1;
        }
        Ok(rewritten)
    }

    /// Replace the `Data` children of the tag at `path`.
    fn write_data(&mut self, path: &NodePath, blocks: [ElementNode; 2]) -> Result<(), L5xError> {
        let old: Vec<NodePath> = self.document.children_paths(path, "Data");
        for data in old.iter().rev() {
            self.document.remove_subtree(data)?;
        }
        for data in blocks {
            self.document.insert_at(path, data)?;
        }
        self.structure_changed();
        Ok(())
    }
}

/// A base tag as it was before a type changed.
pub(super) struct TagSnapshot {
    scope: TagScope,
    name: String,
    shape: Shape,
    value: Value,
}

/// Scope and name of every base tag, controller tags first.
fn base_tags(document: &Document) -> Vec<(TagScope, String)> {
    let names = |parent: &NodePath| -> Vec<String> {
        document
            .find(parent, &[("Tags", None)])
            .map(|tags| {
                document
                    .children_paths(&tags, "Tag")
                    .iter()
                    .filter_map(|p| document.node(p))
                    .filter(|t| t.attribute("TagType") != Some("Alias"))
                    .filter_map(|t| t.name().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };
    let Ok(controller) = document.controller() else {
        return Vec::new();
    };
    let mut tags: Vec<(TagScope, String)> = names(&controller)
        .into_iter()
        .map(|name| (TagScope::Controller, name))
        .collect();
    if let Some(programs) = document.find(&controller, &[("Programs", None)]) {
        for program in document.children_paths(&programs, "Program") {
            let Some(program_name) = document.node(&program).and_then(ElementNode::name) else {
                continue;
            };
            let scope = TagScope::program(program_name);
            tags.extend(names(&program).into_iter().map(|name| (scope.clone(), name)));
        }
    }
    tags
}

/// Layout of a tag that stores data, or `None` for opaque and unresolvable
/// types.
fn data_shape(document: &Document, tag: &ElementNode) -> Option<Shape> {
    let data_type = tag.attribute("DataType")?;
    if document.schema().is_opaque_type(data_type) || data_type.contains(':') {
        return None;
    }
    codec::tag_shape(document, tag).ok()
}

/// Current value of a tag.
///
/// Read from the Decorated form when present, else from the L5K form. A tag
/// without data reads as zero.
pub(super) fn read_value(document: &Document, scope: &TagScope, name: &str) -> Result<Value, L5xError> {
    let path = tag_path(document, scope, name)?;
    let tag = document.require(&path)?;
    let shape = value_shape(document, tag, name)?;
    current_value(&shape, tag, name)
}

fn value_shape(document: &Document, tag: &ElementNode, name: &str) -> Result<Shape, L5xError> {
    if tag.attribute("TagType") == Some("Alias") {
        return Err(L5xError::InvalidArgument(format!(
            "`{name}` is an alias; use the tag it stands for"
        )));
    }
    codec::tag_shape(document, tag).map_err(|err| L5xError::new_codec_error(err, name))
}

fn current_value(shape: &Shape, tag: &ElementNode, name: &str) -> Result<Value, L5xError> {
    let decorated = codec::tag_data(tag, "Decorated").and_then(|d| d.children().first());
    let compact = codec::tag_data(tag, "L5K").and_then(ElementNode::text);
    let value = match (decorated, compact) {
        (Some(structured), _) => codec::decode(shape, structured),
        (None, Some(text)) => codec::decode_compact(shape, text.trim()),
        (None, None) => Ok(shape.zero_value()),
    };
    value.map_err(|err| L5xError::new_codec_error(err, name))
}

/// The two `Data` elements of a value.
fn data_blocks(shape: &Shape, value: &Value, name: &str) -> Result<[ElementNode; 2], L5xError> {
    let encoded = codec::encode(shape, value).map_err(|err| L5xError::new_codec_error(err, name))?;
    Ok([
        ElementNode::new("Data")
            .with_attribute("Format", "L5K")
            .with_text(encoded.compact),
        ElementNode::new("Data")
            .with_attribute("Format", "Decorated")
            .with_child(encoded.structured),
    ])
}

/// Lay `update` over `base`.
///
/// Structures merge member by member, ignoring case in member names. Names
/// `base` lacks are added so encoding rejects them.
fn merge_value(base: &mut Value, update: &Value) {
    match (base, update) {
        (Value::Structure(current), Value::Structure(changes)) => {
            for (member, change) in changes {
                match current
                    .iter_mut()
                    .find(|(name, _)| name.eq_ignore_ascii_case(member))
                {
                    Some((_, value)) => merge_value(value, change),
                    None => {
                        current.insert(member.clone(), change.clone());
                    }
                }
            }
        }
        (base, update) => *base = update.clone(),
    }
}
