//! No two modules occupy the same slot of a parent.

use std::collections::HashMap;

use l5x_core::ElementNode;

use super::{FindingKind, Findings};
use crate::document::Document;

pub(super) fn check(document: &Document, findings: &mut Findings) {
    let Some(modules) = document.find_in_controller(&[("Modules", None)]) else {
        return;
    };

    let mut occupied: HashMap<Slot, String> = HashMap::new();
    for path in document.children_paths(&modules, "Module") {
        let Some(module) = document.node(&path) else {
            continue;
        };
        let Some(slot) = slot_of(module) else {
            continue;
        };
        let name = module.name().unwrap_or_default();
        match occupied.get(&slot) {
            Some(first) => findings.error(
                FindingKind::SlotConflict,
                document.describe(&path),
                format!(
                    "`{name}` and `{first}` both sit at address {} of `{}` port {}",
                    slot.2, slot.0, slot.1
                ),
            ),
            None => {
                occupied.insert(slot, name.to_string());
            }
        }
    }
}

/// `(parent, parent port, address)` of a module's upstream connection.
pub(crate) type Slot = (String, String, String);

/// The slot a module occupies.
///
/// The controller is its own parent and occupies no slot.
pub(crate) fn slot_of(module: &ElementNode) -> Option<Slot> {
    let parent = module.attribute("ParentModule")?;
    if module.name().is_some_and(|n| n.eq_ignore_ascii_case(parent)) {
        return None;
    }
    let port = module.attribute("ParentModPortId").unwrap_or_default();
    let address = module
        .child("Ports")?
        .children_labeled("Port")
        .find(|p| p.attribute("Upstream") == Some("true"))?
        .attribute("Address")?;
    Some((
        parent.to_ascii_lowercase(),
        port.to_string(),
        address.trim().to_string(),
    ))
}
