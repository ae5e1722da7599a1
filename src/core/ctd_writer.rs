// src/core/ctd_writer.rs

//! Applies value edits to a CTD document without disturbing anything else.
//!
//! Edits address elements through the document's own `NODE` structure. An
//! `ITEM` edit rewrites only the bytes of its `value` attribute; an
//! `ITEMLIST` edit replaces its `LISTITEM` children. Every edit is checked
//! against the type and restrictions the document declares, and a failed edit
//! leaves the document unchanged.

use crate::{
    constants::{ATTR_VALUE, TAG_LISTITEM},
    core::{
        ctd_document::{malformed, CtdDocument, CtdError, Outline, ParamElement, ParamTag},
        ctd_reader::build_parameter,
    },
};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::path::Path;

/// Applies value edits to a parsed CTD document without touching anything else.
#[derive(Debug, Clone)]
pub struct CtdWriter {
    document: CtdDocument,
    outline: Outline,
}

impl CtdWriter {
    /// Fails if `document` is not a valid CTD document.
    pub fn new(document: CtdDocument) -> Result<Self, CtdError> {
        let outline = document.outline()?;
        Ok(Self { document, outline })
    }

    pub fn from_path(path: &Path) -> Result<Self, CtdError> {
        Self::new(CtdDocument::from_path(path)?)
    }

    pub fn document(&self) -> &CtdDocument {
        &self.document
    }

    pub fn into_document(self) -> CtdDocument {
        self.document
    }

    /// Sets the value of the parameter at `path`, given in its string encoding.
    ///
    /// Fails with `UnknownParameterPath` when the document has no `ITEM` or
    /// `ITEMLIST` at `path`, and with `InvalidParameterValue` when the value does
    /// not parse or validate. Repeated edits of one path keep the last value.
    pub fn set_parameter_value(&mut self, path: &str, value: &str) -> Result<(), CtdError> {
        let element = self
            .outline
            .find(path)
            .ok_or_else(|| CtdError::UnknownParameterPath {
                path: path.to_string(),
            })?;

        let mut parameter = build_parameter(element)?;
        parameter
            .fill_from_string(value)
            .map_err(|source| CtdError::InvalidParameterValue {
                path: path.to_string(),
                source,
            })?;

        let mut document = self.document.clone();
        match element.tag {
            ParamTag::Item => {
                document.patch_attribute(element.start, ATTR_VALUE, &parameter.string_rep())?;
            }
            ParamTag::ItemList => {
                let items = parameter.value().map(|v| v.elements()).unwrap_or_default();
                rewrite_list(&mut document, element, &items)?;
            }
            ParamTag::Node => {
                return Err(CtdError::UnknownParameterPath {
                    path: path.to_string(),
                });
            }
        }

        let outline = document.outline()?;
        log::debug!("Set '{}' to '{}'", path, parameter.string_rep());
        self.document = document;
        self.outline = outline;
        Ok(())
    }

    /// Applies `edits` in order, stopping at the first failure.
    pub fn apply<'a>(&mut self, edits: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<(), CtdError> {
        for (path, value) in edits {
            self.set_parameter_value(path, value)?;
        }
        Ok(())
    }

    /// The edited document, byte for byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CtdError> {
        self.document.to_bytes()
    }

    /// Serializes the edited document to `destination`.
    pub fn write(&self, destination: &Path) -> Result<(), CtdError> {
        log::debug!("Writing CTD document to '{}'", destination.display());
        self.document.write_to(destination)
    }
}

/// Replaces the `LISTITEM` children of an `ITEMLIST` with `items`, reusing the
/// indentation found around the list. Comments and processing instructions
/// inside the list are kept ahead of the new items.
fn rewrite_list(document: &mut CtdDocument, element: &ParamElement, items: &[String]) -> Result<(), CtdError> {
    let list_start = match document.event(element.start) {
        Some(Event::Start(start) | Event::Empty(start)) => start.clone(),
        _ => return Err(malformed(format!("'{}' does not start with a tag", element.dotted_path()))),
    };
    let is_empty_tag = matches!(document.event(element.start), Some(Event::Empty(_)));
    if is_empty_tag && items.is_empty() {
        return Ok(());
    }

    let base_indent = element
        .start
        .checked_sub(1)
        .and_then(|i| document.event(i))
        .and_then(trailing_indent);
    let existing_children = element.end > element.start + 1;

    let item_ws = existing_children
        .then(|| whitespace_at(document, element.start + 1))
        .flatten()
        .filter(|ws| ws.contains('\n') && !element.list_values.is_empty())
        .or_else(|| base_indent.as_ref().map(|indent| format!("\n{}  ", indent)));
    let closing_ws = existing_children
        .then(|| whitespace_at(document, element.end - 1))
        .flatten()
        .or_else(|| base_indent.as_ref().map(|indent| format!("\n{}", indent)));

    let kept: Vec<Event<'static>> = (element.start + 1..element.end)
        .filter_map(|i| document.event(i))
        .filter(|event| matches!(event, Event::Comment(_) | Event::PI(_)))
        .cloned()
        .collect();

    let mut children: Vec<Event<'static>> = Vec::with_capacity((kept.len() + items.len()) * 2 + 1);
    for event in &kept {
        if let Some(ws) = &item_ws {
            children.push(Event::Text(BytesText::from_escaped(ws.clone())));
        }
        children.push(event.clone());
    }
    for item in items {
        if let Some(ws) = &item_ws {
            children.push(Event::Text(BytesText::from_escaped(ws.clone())));
        }
        let mut list_item = BytesStart::new(TAG_LISTITEM);
        list_item.push_attribute((ATTR_VALUE, item.as_str()));
        children.push(Event::Empty(list_item));
    }
    if let Some(ws) = closing_ws.filter(|_| !children.is_empty()) {
        children.push(Event::Text(BytesText::from_escaped(ws)));
    }

    if is_empty_tag {
        let name = String::from_utf8(list_start.name().as_ref().to_vec()).map_err(|e| malformed(e.to_string()))?;
        let mut replacement = Vec::with_capacity(children.len() + 2);
        replacement.push(Event::Start(list_start));
        replacement.extend(children);
        replacement.push(Event::End(BytesEnd::new(name)));
        document.splice(element.start..element.start + 1, replacement)
    } else {
        document.splice(element.start + 1..element.end, children)
    }
}

fn whitespace_at(document: &CtdDocument, index: usize) -> Option<String> {
    match document.event(index) {
        Some(Event::Text(text)) => {
            let raw = std::str::from_utf8(text).ok()?;
            raw.trim().is_empty().then(|| raw.to_string())
        }
        _ => None,
    }
}

/// Indentation after the last line break of a whitespace text event.
fn trailing_indent(event: &Event<'static>) -> Option<String> {
    let Event::Text(text) = event else {
        return None;
    };
    let raw = std::str::from_utf8(text).ok()?;
    let (_, indent) = raw.rsplit_once('\n')?;
    indent.trim().is_empty().then(|| indent.to_string())
}

// MARK: --- UNIT TESTS ---
