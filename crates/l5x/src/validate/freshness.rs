//! Modified Add-On Instructions carry a new edit timestamp.

use super::{FindingKind, Findings};
use crate::document::{Document, content_digest};

pub(super) fn check(document: &Document, findings: &mut Findings) {
    let Some(definitions) = document.find_in_controller(&[("AddOnInstructionDefinitions", None)])
    else {
        return;
    };

    for path in document.children_paths(&definitions, "AddOnInstructionDefinition") {
        let Some(aoi) = document.node(&path) else {
            continue;
        };
        let name = aoi.name().unwrap_or_default();
        let edited = aoi.attribute("EditedDate");
        if edited.is_none() {
            findings.warning(
                FindingKind::MissingEditDate,
                document.describe(&path),
                format!("add-on instruction `{name}` has no EditedDate"),
            );
        }

        let Some(baseline) = document.aoi_baseline(name) else {
            continue;
        };
        if baseline.digest != content_digest(aoi) && baseline.edited_date.as_deref() == edited {
            findings.error(
                FindingKind::StaleEditDate,
                document.describe(&path),
                format!("add-on instruction `{name}` changed but its EditedDate did not"),
            );
        }
    }
}
