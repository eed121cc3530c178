//! Both stored value forms are present and agree.

use l5x_core::ElementNode;

use super::{
    FindingKind, Findings,
    references::{is_alias, tag_paths},
};
use crate::{
    codec::{self, CodecError},
    document::Document,
};

pub(super) fn check(document: &Document, findings: &mut Findings) {
    for path in tag_paths(document) {
        let Some(tag) = document.node(&path) else {
            continue;
        };
        if is_alias(tag) {
            continue;
        }
        let data_type = tag.attribute("DataType").unwrap_or_default();
        if document.schema().is_opaque_type(data_type) {
            continue;
        }
        let Ok(shape) = codec::tag_shape(document, tag) else {
            continue;
        };

        let compact = codec::tag_data(tag, "L5K").and_then(ElementNode::text);
        let structured = codec::tag_data(tag, "Decorated").and_then(|d| d.children().first());
        let (compact, structured) = match (compact, structured) {
            (Some(compact), Some(structured)) => (compact, structured),
            (compact, _) => {
                let missing = if compact.is_none() { "L5K" } else { "Decorated" };
                findings.error(
                    FindingKind::MissingFormat,
                    document.describe(&path),
                    format!("tag has no {missing} data"),
                );
                continue;
            }
        };

        match codec::decode_checked(&shape, compact.trim(), structured) {
            Ok(_) => {}
            Err(CodecError::FormatMismatch { path: member }) => findings.error(
                FindingKind::FormatMismatch,
                document.describe(&path),
                if member.is_empty() {
                    "L5K and Decorated values disagree".to_string()
                } else {
                    format!("L5K and Decorated values disagree at `{member}`")
                },
            ),
            Err(err) => findings.error(
                FindingKind::UndecodableData,
                document.describe(&path),
                format!("stored data does not fit `{data_type}`: {err}"),
            ),
        }
    }
}
