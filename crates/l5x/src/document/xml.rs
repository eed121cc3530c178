//! Markup reading and writing.
//!
//! Reading uses `quick-xml` events. Writing is done by hand so the output
//! keeps the layout the consuming application produces itself: one element
//! per line and literal payloads wrapped in CDATA sections.

use std::fmt::Write as _;

use log::trace;
use quick_xml::{
    Reader,
    escape::{escape, partial_escape},
    events::{BytesStart, Event},
};

use l5x_core::{Content, ElementNode};

use super::DocumentError;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CDATA_DELIMITER: &str = "]]>";

/// Elements whose text is always written as CDATA.
const CDATA_LABELS: &[&str] = &[
    "Text",
    "Comment",
    "Description",
    "Line",
    "RevisionNote",
    "AdditionalHelpText",
];

/// Whether the text of `node` is written as a CDATA section.
pub(super) fn is_cdata(node: &ElementNode) -> bool {
    match node.label() {
        "Data" | "DefaultData" => matches!(node.attribute("Format"), Some("L5K" | "String")),
        "DataValueMember" => node.attribute("Radix") == Some("ASCII"),
        label => CDATA_LABELS.contains(&label),
    }
}

/// Reject a CDATA payload that would end its own section.
pub(crate) fn check_cdata(label: &str, text: &str) -> Result<(), DocumentError> {
    if text.contains(CDATA_DELIMITER) {
        return Err(DocumentError::CdataDelimiter {
            label: label.to_string(),
        });
    }
    Ok(())
}

pub(super) fn read_tree(text: &str) -> Result<ElementNode, DocumentError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<ElementNode> = Vec::new();
    let mut root = None;

    loop {
        let event = reader.read_event().map_err(|err| {
            DocumentError::Xml(format!("{err} (near byte {})", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let node = open_element(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| DocumentError::Xml(err.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|err| DocumentError::Xml(err.to_string()))?;
                append_text(&mut stack, text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DocumentError::Xml(format!(
            "element `{}` is never closed",
            open.label()
        )));
    }
    root.ok_or_else(|| DocumentError::Xml("document has no root element".to_string()))
}

fn open_element(start: &BytesStart<'_>) -> Result<ElementNode, DocumentError> {
    let label = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| DocumentError::Xml(err.to_string()))?
        .to_string();
    let mut node = ElementNode::new(label);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| DocumentError::Xml(err.to_string()))?;
        let name = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|err| DocumentError::Xml(err.to_string()))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|err| DocumentError::Xml(err.to_string()))?;
        node.set_attribute(name, value);
    }
    Ok(node)
}

fn attach(
    stack: &mut [ElementNode],
    root: &mut Option<ElementNode>,
    node: ElementNode,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => match parent.content() {
            Content::Text(text) if !text.is_empty() => Err(DocumentError::Xml(format!(
                "element `{}` mixes text and child elements",
                parent.label()
            ))),
            _ => {
                parent.push_child(node);
                Ok(())
            }
        },
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(DocumentError::Xml(
            "document has more than one root element".to_string(),
        )),
    }
}

fn append_text(stack: &mut [ElementNode], text: &str) -> Result<(), DocumentError> {
    let Some(node) = stack.last_mut() else {
        return Ok(());
    };
    match node.content() {
        Content::Children(children) if !children.is_empty() => Err(DocumentError::Xml(format!(
            "element `{}` mixes text and child elements",
            node.label()
        ))),
        Content::Children(_) => {
            node.set_text(text);
            Ok(())
        }
        Content::Text(existing) => {
            let joined = format!("{existing}{text}");
            node.set_text(joined);
            Ok(())
        }
    }
}

pub(super) fn write_tree(root: &ElementNode) -> Result<String, DocumentError> {
    let mut out = String::with_capacity(4096);
    out.push_str(DECLARATION);
    out.push('\n');
    write_element(root, &mut out)?;
    trace!(bytes = out.len(); "Serialized document");
    Ok(out)
}

fn write_element(node: &ElementNode, out: &mut String) -> Result<(), DocumentError> {
    out.push('<');
    out.push_str(node.label());
    for (name, value) in node.attributes() {
        // Writing into a String cannot fail.
        let _ = write!(out, " {name}=\"{}\"", escape(value.as_str()));
    }

    match node.content() {
        Content::Children(children) if children.is_empty() => out.push_str("/>\n"),
        Content::Children(children) => {
            out.push_str(">\n");
            for child in children {
                write_element(child, out)?;
            }
            close(node, out);
        }
        Content::Text(text) if is_cdata(node) => {
            check_cdata(node.label(), text)?;
            out.push_str(">\n<![CDATA[");
            out.push_str(text);
            out.push_str("]]>\n");
            close(node, out);
        }
        Content::Text(text) => {
            out.push('>');
            out.push_str(&partial_escape(text.as_str()));
            close(node, out);
        }
    }
    Ok(())
}

fn close(node: &ElementNode, out: &mut String) {
    out.push_str("</");
    out.push_str(node.label());
    out.push_str(">\n");
}
