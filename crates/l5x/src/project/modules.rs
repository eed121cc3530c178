//! I/O modules.
//!
//! A module's configuration is too device-specific to build from scratch, so
//! new modules come from a template: any element holding a `Module`, such as
//! another project or a module export.

use log::info;

use l5x_core::{ElementNode, naming::validate_name};

use super::Transaction;
use crate::{
    document::{Document, NodePath, check_cdata},
    error::L5xError,
    validate::slot_of,
};

/// Where an imported module is attached.
#[derive(Debug, Clone)]
pub struct ModulePlacement {
    parent: String,
    parent_port: String,
    address: Option<String>,
    slot: Option<String>,
    description: Option<String>,
}

impl Default for ModulePlacement {
    /// Port 1 of the controller's own module, `Local`.
    fn default() -> Self {
        Self {
            parent: "Local".to_string(),
            parent_port: "1".to_string(),
            address: None,
            slot: None,
            description: None,
        }
    }
}

impl ModulePlacement {
    pub fn with_parent(mut self, parent: impl Into<String>, port: impl Into<String>) -> Self {
        self.parent = parent.into();
        self.parent_port = port.into();
        self
    }

    /// Address of the first downstream port, e.g. an IP address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Address of the upstream port, the slot in the parent's chassis.
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Transaction<'_> {
    /// Add a copy of the first `Module` in `template` under `name`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid or taken name, a template without a module, a
    /// missing parent module, and with [`L5xError::SlotTaken`] when another
    /// module already sits at the new module's address.
    pub fn import_module(
        &mut self,
        template: &ElementNode,
        name: &str,
        placement: &ModulePlacement,
    ) -> Result<(), L5xError> {
        validate_name(name)?;
        if module_path(self.document, name).is_ok() {
            return Err(L5xError::already_exists("module", name));
        }
        let parent = module_path(self.document, &placement.parent)?;
        let parent = self
            .document
            .require(&parent)?
            .name()
            .unwrap_or(&placement.parent)
            .to_string();
        let source = template
            .descendants()
            .find(|e| e.label() == "Module")
            .ok_or_else(|| L5xError::InvalidArgument("template holds no module".to_string()))?;

        let module = configure(source, name, &parent, placement)?;
        if let Some(slot) = slot_of(&module) {
            let occupant = modules(self.document)
                .into_iter()
                .filter_map(|path| self.document.node(&path))
                .find(|other| slot_of(other).as_ref() == Some(&slot));
            if let Some(occupant) = occupant {
                return Err(L5xError::SlotTaken {
                    name: name.to_string(),
                    parent,
                    address: slot.2,
                    occupant: occupant.name().unwrap_or_default().to_string(),
                });
            }
        }

        let controller = self.controller()?;
        let container = self.document.ensure_container(&controller, "Modules")?;
        self.document.insert_at(&container, module)?;
        self.structure_changed();
        info!(module = name, parent:% = parent; "Imported module");
        Ok(())
    }

    /// Delete a module and every module attached below it.
    ///
    /// The controller's own module cannot be deleted.
    pub fn delete_module(&mut self, name: &str) -> Result<(), L5xError> {
        let path = module_path(self.document, name)?;
        let module = self.document.require(&path)?;
        if module
            .attribute("ParentModule")
            .is_some_and(|p| module.name().is_some_and(|n| n.eq_ignore_ascii_case(p)))
        {
            return Err(L5xError::InvalidArgument(format!(
                "module `{name}` is the controller and cannot be deleted"
            )));
        }
        let before = modules(self.document).len();
        self.document.remove_subtree(&path)?;
        let removed = before - modules(self.document).len();
        self.structure_changed();
        info!(module = name, removed; "Deleted module");
        Ok(())
    }

    /// Set the address of one port of a module.
    pub fn set_module_address(
        &mut self,
        name: &str,
        port_id: &str,
        address: &str,
    ) -> Result<(), L5xError> {
        let path = module_path(self.document, name)?;
        let port = self
            .document
            .find(&path, &[("Ports", None)])
            .map(|ports| self.document.children_paths(&ports, "Port"))
            .unwrap_or_default()
            .into_iter()
            .find(|p| self.document.node(p).and_then(|n| n.attribute("Id")) == Some(port_id))
            .ok_or_else(|| L5xError::not_found("port", format!("{name}/{port_id}")))?;
        self.document.set_attribute(&port, "Address", address)?;
        info!(module = name, port = port_id, address; "Set module address");
        Ok(())
    }

    pub fn set_module_inhibited(&mut self, name: &str, inhibited: bool) -> Result<(), L5xError> {
        let path = module_path(self.document, name)?;
        self.document
            .set_attribute(&path, "Inhibited", if inhibited { "true" } else { "false" })?;
        info!(module = name, inhibited; "Set module inhibit");
        Ok(())
    }
}

fn module_path(document: &Document, name: &str) -> Result<NodePath, L5xError> {
    document
        .find_in_controller(&[("Modules", None), ("Module", Some(name))])
        .ok_or_else(|| L5xError::not_found("module", name))
}

fn modules(document: &Document) -> Vec<NodePath> {
    document
        .find_in_controller(&[("Modules", None)])
        .map(|container| document.children_paths(&container, "Module"))
        .unwrap_or_default()
}

/// A copy of `source` named and attached as `placement` says.
fn configure(
    source: &ElementNode,
    name: &str,
    parent: &str,
    placement: &ModulePlacement,
) -> Result<ElementNode, L5xError> {
    let mut module = source.clone();
    module.remove_attribute("Use");
    module.set_attribute("Name", name);
    module.set_attribute("ParentModule", parent);
    module.set_attribute("ParentModPortId", placement.parent_port.as_str());

    let Some(children) = module.children_mut() else {
        return Ok(module);
    };
    if let Some(description) = &placement.description {
        check_cdata("Description", description)?;
        children.retain(|c| c.label() != "Description");
        children.insert(0, ElementNode::new("Description").with_text(description.as_str()));
    }
    let ports = children
        .iter_mut()
        .find(|c| c.label() == "Ports")
        .and_then(ElementNode::children_mut);
    if let Some(ports) = ports {
        let upstream = |p: &ElementNode| p.attribute("Upstream") == Some("true");
        if let Some(slot) = &placement.slot {
            if let Some(port) = ports.iter_mut().find(|p| upstream(&**p)) {
                port.set_attribute("Address", slot.as_str());
            }
        }
        if let Some(address) = &placement.address {
            if let Some(port) = ports.iter_mut().find(|p| !upstream(&**p)) {
                port.set_attribute("Address", address.as_str());
            }
        }
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::tests::sample, project::Project};

    fn card() -> ElementNode {
        ElementNode::new("Module")
            .with_attribute("Name", "Template")
            .with_attribute("CatalogNumber", "1756-IB16")
            .with_attribute("ParentModule", "Local")
            .with_attribute("ParentModPortId", "1")
            .with_child(
                ElementNode::new("Ports").with_child(
                    ElementNode::new("Port")
                        .with_attribute("Id", "1")
                        .with_attribute("Address", "0")
                        .with_attribute("Type", "ICP")
                        .with_attribute("Upstream", "true"),
                ),
            )
    }

    fn adapter() -> ElementNode {
        ElementNode::new("Module")
            .with_attribute("Name", "Template")
            .with_attribute("CatalogNumber", "1756-EN2T")
            .with_attribute("ParentModule", "Local")
            .with_attribute("ParentModPortId", "1")
            .with_child(
                ElementNode::new("Ports")
                    .with_child(
                        ElementNode::new("Port")
                            .with_attribute("Id", "1")
                            .with_attribute("Address", "0")
                            .with_attribute("Type", "ICP")
                            .with_attribute("Upstream", "true"),
                    )
                    .with_child(
                        ElementNode::new("Port")
                            .with_attribute("Id", "2")
                            .with_attribute("Type", "Ethernet")
                            .with_attribute("Upstream", "false"),
                    ),
            )
    }

    fn module_names(project: &Project) -> Vec<String> {
        let document = project.document();
        modules(document)
            .iter()
            .filter_map(|p| document.node(p).and_then(ElementNode::name))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_import_module_places_and_addresses_it() {
        let mut project = Project::new(sample());
        let placement = ModulePlacement::default()
            .with_slot("2")
            .with_address("192.168.1.20")
            .with_description("Line network");
        project.import_module(&adapter(), "Enet", &placement).unwrap();

        assert_eq!(module_names(&project), ["Local", "Enet"]);
        let document = project.document();
        let module = document.require(&module_path(document, "enet").unwrap()).unwrap();
        assert_eq!(module.children()[0].text(), Some("Line network"));
        let addresses: Vec<_> = module
            .child("Ports")
            .unwrap()
            .children_labeled("Port")
            .map(|p| p.attribute("Address").unwrap_or_default())
            .collect();
        assert_eq!(addresses, ["2", "192.168.1.20"]);
        assert!(!project.validate().has_errors());
    }

    #[test]
    fn test_import_module_rejects_a_taken_slot() {
        let mut project = Project::new(sample());
        let placement = ModulePlacement::default().with_slot("3");
        project.import_module(&card(), "Inputs", &placement).unwrap();

        let err = project.import_module(&card(), "More", &placement).unwrap_err();
        match err {
            L5xError::SlotTaken {
                name,
                address,
                occupant,
                ..
            } => {
                assert_eq!(name, "More");
                assert_eq!(address, "3");
                assert_eq!(occupant, "Inputs");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(module_names(&project), ["Local", "Inputs"]);

        let err = project.import_module(&card(), "inputs", &placement).unwrap_err();
        assert!(matches!(err, L5xError::AlreadyExists { kind: "module", .. }));
        let elsewhere = ModulePlacement::default().with_parent("Rack2", "1");
        let err = project.import_module(&card(), "Far", &elsewhere).unwrap_err();
        assert!(matches!(err, L5xError::NotFound { kind: "module", .. }));
    }

    #[test]
    fn test_delete_module_removes_its_children() {
        let mut project = Project::new(sample());
        project
            .import_module(&adapter(), "Enet", &ModulePlacement::default().with_slot("1"))
            .unwrap();
        let below = ModulePlacement::default().with_parent("Enet", "2").with_slot("4");
        project.import_module(&card(), "Remote", &below).unwrap();
        project
            .import_module(&card(), "Near", &ModulePlacement::default().with_slot("5"))
            .unwrap();
        assert_eq!(module_names(&project), ["Local", "Enet", "Remote", "Near"]);

        project.delete_module("ENET").unwrap();
        assert_eq!(module_names(&project), ["Local", "Near"]);

        let err = project.delete_module("Local").unwrap_err();
        assert!(matches!(err, L5xError::InvalidArgument(_)));
        assert!(project.delete_module("Enet").is_err());
    }

    #[test]
    fn test_module_address_and_inhibit() {
        let mut project = Project::new(sample());
        project
            .import_module(&card(), "Inputs", &ModulePlacement::default().with_slot("3"))
            .unwrap();
        project
            .import_module(&card(), "Outputs", &ModulePlacement::default().with_slot("4"))
            .unwrap();

        project.set_module_inhibited("Inputs", true).unwrap();
        let document = project.document();
        let path = module_path(document, "Inputs").unwrap();
        assert_eq!(document.require(&path).unwrap().attribute("Inhibited"), Some("true"));

        // Moving onto an occupied slot fails validation and rolls back.
        let err = project.set_module_address("Outputs", "1", "3").unwrap_err();
        assert!(matches!(err, L5xError::Transaction(_)));
        project.set_module_address("Outputs", "1", "6").unwrap();
        let err = project.set_module_address("Outputs", "9", "6").unwrap_err();
        assert!(matches!(err, L5xError::NotFound { kind: "port", .. }));
    }
}
