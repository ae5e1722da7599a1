// src/core/ctd_document.rs

//! Editable representation of a CTD document.
//!
//! The document is kept as the flat event stream produced by `quick-xml`, so
//! that serializing an unmodified document reproduces its bytes and an edit
//! only touches the events it targets. [`CtdDocument::outline`] walks the
//! stream once and extracts what the reader and the writer need: tool
//! metadata, every `NODE`/`ITEM`/`ITEMLIST` with its dotted path and event
//! span, and the optional `cli` mapping.

use crate::{
    constants::*,
    core::{command_line::CliElement, parameters::ParameterError, tree::TreeError},
    models::ToolInfo,
};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading, validating or rewriting a CTD document.
#[derive(Error, Debug)]
pub enum CtdError {
    #[error("Failed to access CTD document '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CTD document: {message}")]
    MalformedDocument { message: String },
    #[error("Parameter '{path}' declares the unsupported type '{declared}'.")]
    UnsupportedParameterType { path: String, declared: String },
    #[error("Invalid value for parameter '{path}': {source}")]
    InvalidParameterValue {
        path: String,
        #[source]
        source: ParameterError,
    },
    #[error("The document declares no parameter at path '{path}'.")]
    UnknownParameterPath { path: String },
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Failed to serialize CTD document: {message}")]
    Serialize { message: String },
}

pub(crate) fn malformed(message: impl Into<String>) -> CtdError {
    CtdError::MalformedDocument {
        message: message.into(),
    }
}

// --- DOCUMENT ---

/// A parsed CTD document that can be patched and written back.
#[derive(Debug, Clone)]
pub struct CtdDocument {
    events: Vec<Event<'static>>,
}

impl CtdDocument {
    /// Parses `xml` and checks its structure. Whitespace and comments are kept.
    pub fn parse(xml: &str) -> Result<Self, CtdError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = true;

        let mut events = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(event) => events.push(event.into_owned()),
                Err(e) => {
                    return Err(malformed(format!(
                        "XML error at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
            }
        }

        let document = Self { events };
        // Structural validation happens once here; callers may rely on `outline` succeeding.
        document.outline()?;
        log::debug!("Parsed CTD document into {} events", document.events.len());
        Ok(document)
    }

    /// Reads and parses the document at `path`.
    pub fn from_path(path: &Path) -> Result<Self, CtdError> {
        let xml = fs::read_to_string(path).map_err(|source| CtdError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&xml)
    }

    /// Serializes the event stream. Untouched events are written verbatim.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CtdError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer
                .write_event(event.clone())
                .map_err(|e| CtdError::Serialize {
                    message: e.to_string(),
                })?;
        }
        Ok(writer.into_inner())
    }

    pub fn write_to(&self, path: &Path) -> Result<(), CtdError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|source| CtdError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn event(&self, index: usize) -> Option<&Event<'static>> {
        self.events.get(index)
    }

    /// Replaces the events in `range` with `replacement`.
    pub(crate) fn splice(&mut self, range: Range<usize>, replacement: Vec<Event<'static>>) -> Result<(), CtdError> {
        if range.start > range.end || range.end > self.events.len() {
            return Err(malformed(format!("event range {:?} is out of bounds", range)));
        }
        self.events.splice(range, replacement);
        Ok(())
    }

    /// Sets attribute `key` of the start tag at `index` to `value`.
    ///
    /// Only the bytes of that attribute value change; if the attribute is
    /// missing it is appended after the last one. Empty and non-empty tags keep
    /// their form.
    pub(crate) fn patch_attribute(&mut self, index: usize, key: &str, value: &str) -> Result<(), CtdError> {
        let (start, is_empty) = match self.events.get(index) {
            Some(Event::Start(start)) => (start, false),
            Some(Event::Empty(start)) => (start, true),
            _ => return Err(malformed(format!("event {} is not a start tag", index))),
        };
        let content: &[u8] = start;
        let escaped = quick_xml::escape::escape(value);

        let mut patched: Vec<u8> = Vec::with_capacity(content.len() + escaped.len() + key.len() + 4);
        match attribute_value_span(start, key)? {
            Some(span) => {
                let (head, tail) = content
                    .get(..span.start)
                    .zip(content.get(span.end..))
                    .ok_or_else(|| malformed("attribute span outside of its tag"))?;
                patched.extend_from_slice(head);
                patched.extend_from_slice(escaped.as_bytes());
                patched.extend_from_slice(tail);
            }
            None => {
                let body = content.trim_ascii_end();
                let trailing = content.get(body.len()..).unwrap_or_default();
                patched.extend_from_slice(body);
                patched.extend_from_slice(format!(" {}=\"{}\"", key, escaped).as_bytes());
                patched.extend_from_slice(trailing);
            }
        }

        let name_len = start.name().as_ref().len();
        let text = String::from_utf8(patched).map_err(|e| malformed(e.to_string()))?;
        let rebuilt = BytesStart::from_content(text, name_len);
        let event = if is_empty {
            Event::Empty(rebuilt)
        } else {
            Event::Start(rebuilt)
        };
        if let Some(slot) = self.events.get_mut(index) {
            *slot = event;
        }
        Ok(())
    }

    /// Extracts the structural outline of the document.
    pub(crate) fn outline(&self) -> Result<Outline, CtdError> {
        let mut builder = OutlineBuilder::default();
        for (index, event) in self.events.iter().enumerate() {
            match event {
                Event::Start(start) => {
                    let frame = builder.open(index, start)?;
                    builder.stack.push(frame);
                }
                Event::Empty(start) => {
                    let frame = builder.open(index, start)?;
                    builder.close(frame, index);
                }
                Event::End(_) => {
                    let frame = builder
                        .stack
                        .pop()
                        .ok_or_else(|| malformed("closing tag without a matching opening tag"))?;
                    builder.close(frame, index);
                }
                Event::Text(text) => {
                    if let Some(field) = builder.current_meta() {
                        let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                        builder.info_text(field, &text);
                    }
                }
                Event::CData(data) => {
                    if let Some(field) = builder.current_meta() {
                        let text = std::str::from_utf8(data).map_err(|e| malformed(e.to_string()))?;
                        builder.info_text(field, text);
                    }
                }
                _ => {}
            }
        }
        builder.finish()
    }
}

/// Byte range of the value of attribute `key` inside the tag content.
fn attribute_value_span(start: &BytesStart<'_>, key: &str) -> Result<Option<Range<usize>>, CtdError> {
    let content: &[u8] = start;
    let base = content.as_ptr() as usize;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(e.to_string()))?;
        if attr.key.as_ref() != key.as_bytes() {
            continue;
        }
        let Cow::Borrowed(raw) = attr.value else {
            return Err(malformed(format!("cannot locate attribute '{}' in its tag", key)));
        };
        let offset = (raw.as_ptr() as usize)
            .checked_sub(base)
            .filter(|offset| offset + raw.len() <= content.len())
            .ok_or_else(|| malformed(format!("cannot locate attribute '{}' in its tag", key)))?;
        return Ok(Some(offset..offset + raw.len()));
    }
    Ok(None)
}

// --- OUTLINE ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamTag {
    Node,
    Item,
    ItemList,
}

/// One `NODE`, `ITEM` or `ITEMLIST` element of the `PARAMETERS` section.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParamElement {
    pub(crate) tag: ParamTag,
    /// Names from the root, this element's own name last.
    pub(crate) path: Vec<String>,
    /// Unescaped attributes in document order.
    pub(crate) attributes: IndexMap<String, String>,
    /// Index of the start (or empty) tag event.
    pub(crate) start: usize,
    /// Index of the end tag event; equals `start` for empty tags.
    pub(crate) end: usize,
    /// `LISTITEM` values, for `ITEMLIST` elements.
    pub(crate) list_values: Vec<String>,
}

impl ParamElement {
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub(crate) fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn dotted_path(&self) -> String {
        self.path.join(".")
    }

    /// Dotted path of the enclosing `NODE`, empty at the root.
    pub(crate) fn parent_path(&self) -> String {
        self.path
            .split_last()
            .map(|(_, parents)| parents.join("."))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outline {
    pub(crate) info: ToolInfo,
    /// Parameter elements in document order.
    pub(crate) params: Vec<ParamElement>,
    pub(crate) cli: Vec<CliElement>,
}

impl Outline {
    pub(crate) fn find(&self, dotted_path: &str) -> Option<&ParamElement> {
        self.params
            .iter()
            .find(|element| element.tag != ParamTag::Node && element.dotted_path() == dotted_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Name,
    Version,
    Category,
    DocUrl,
    Description,
    Manual,
    ExecutableName,
    ExecutablePath,
}

impl MetaField {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "name" => Some(Self::Name),
            "version" => Some(Self::Version),
            "category" => Some(Self::Category),
            "docurl" => Some(Self::DocUrl),
            "description" => Some(Self::Description),
            "manual" => Some(Self::Manual),
            "executableName" => Some(Self::ExecutableName),
            "executablePath" => Some(Self::ExecutablePath),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Frame {
    tag: String,
    element: Option<usize>,
    cli_element: Option<usize>,
    meta: Option<MetaField>,
}

#[derive(Debug, Default)]
struct OutlineBuilder {
    stack: Vec<Frame>,
    node_path: Vec<String>,
    seen_paths: HashSet<String>,
    has_parameters: bool,
    info: ToolInfo,
    params: Vec<ParamElement>,
    cli: Vec<CliElement>,
}

impl OutlineBuilder {
    fn current_meta(&self) -> Option<MetaField> {
        self.stack.last().and_then(|frame| frame.meta)
    }

    fn open(&mut self, index: usize, start: &BytesStart<'_>) -> Result<Frame, CtdError> {
        let tag = std::str::from_utf8(start.local_name().as_ref())
            .map_err(|e| malformed(e.to_string()))?
            .to_string();
        let parent = self.stack.last().map(|frame| frame.tag.clone());
        let mut frame = Frame {
            tag: tag.clone(),
            element: None,
            cli_element: None,
            meta: None,
        };

        match (parent.as_deref(), tag.as_str()) {
            (None, TAG_TOOL) => {
                let attributes = read_attributes(start)?;
                for (key, value) in attributes {
                    if let Some(field) = MetaField::from_tag(&key) {
                        self.info_text(field, &value);
                    }
                }
            }
            (None, other) => {
                return Err(malformed(format!("root element must be <{}>, found <{}>", TAG_TOOL, other)));
            }
            (Some(TAG_TOOL), TAG_PARAMETERS) => {
                if self.has_parameters {
                    return Err(malformed(format!("more than one <{}> element", TAG_PARAMETERS)));
                }
                self.has_parameters = true;
            }
            (Some(TAG_PARAMETERS | TAG_NODE), TAG_NODE | TAG_ITEM | TAG_ITEMLIST) => {
                let element_tag = match tag.as_str() {
                    TAG_NODE => ParamTag::Node,
                    TAG_ITEM => ParamTag::Item,
                    _ => ParamTag::ItemList,
                };
                frame.element = Some(self.push_element(index, element_tag, start)?);
            }
            (Some(TAG_ITEMLIST), TAG_LISTITEM) => {
                let attributes = read_attributes(start)?;
                let value = attributes.get(ATTR_VALUE).cloned().unwrap_or_default();
                let list = self
                    .stack
                    .last()
                    .and_then(|f| f.element)
                    .and_then(|i| self.params.get_mut(i))
                    .ok_or_else(|| malformed(format!("<{}> outside of <{}>", TAG_LISTITEM, TAG_ITEMLIST)))?;
                list.list_values.push(value);
            }
            (parent, TAG_PARAMETERS | TAG_NODE | TAG_ITEM | TAG_ITEMLIST | TAG_LISTITEM) => {
                return Err(malformed(format!(
                    "unexpected <{}> inside <{}>",
                    tag,
                    parent.unwrap_or_default()
                )));
            }
            (Some(parent @ (TAG_PARAMETERS | TAG_NODE | TAG_ITEM | TAG_ITEMLIST | TAG_LISTITEM)), other) => {
                return Err(malformed(format!("unexpected <{}> inside <{}>", other, parent)));
            }
            (Some(TAG_TOOL), TAG_CLI) => {}
            (Some(TAG_CLI), TAG_CLI_ELEMENT) => {
                let attributes = read_attributes(start)?;
                let is_list = attributes
                    .get("isList")
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
                self.cli.push(CliElement {
                    option_identifier: attributes.get("optionIdentifier").cloned().unwrap_or_default(),
                    suffix: attributes.get("suffix").cloned().unwrap_or_default(),
                    is_list,
                    mappings: Vec::new(),
                });
                frame.cli_element = Some(self.cli.len() - 1);
            }
            (Some(TAG_CLI_ELEMENT), TAG_MAPPING) => {
                let attributes = read_attributes(start)?;
                let reference = attributes
                    .get("referenceName")
                    .cloned()
                    .ok_or_else(|| malformed(format!("<{}> without referenceName", TAG_MAPPING)))?;
                if let Some(element) = self
                    .stack
                    .last()
                    .and_then(|f| f.cli_element)
                    .and_then(|i| self.cli.get_mut(i))
                {
                    element.mappings.push(reference);
                }
            }
            (Some(TAG_TOOL), other) => {
                frame.meta = MetaField::from_tag(other);
            }
            _ => log::trace!("Ignoring <{}> at event {}", tag, index),
        }
        Ok(frame)
    }

    fn push_element(&mut self, index: usize, tag: ParamTag, start: &BytesStart<'_>) -> Result<usize, CtdError> {
        let attributes = read_attributes(start)?;
        let name = attributes
            .get(ATTR_NAME)
            .cloned()
            .ok_or_else(|| malformed(format!("{:?} element without a name at event {}", tag, index)))?;
        if name.is_empty() || name.contains('.') {
            return Err(malformed(format!("invalid element name '{}'", name)));
        }

        let mut path = self.node_path.clone();
        path.push(name.clone());
        let dotted = path.join(".");
        if !self.seen_paths.insert(dotted.clone()) {
            return Err(malformed(format!("duplicate element at path '{}'", dotted)));
        }
        if tag == ParamTag::Node {
            self.node_path.push(name);
        }

        self.params.push(ParamElement {
            tag,
            path,
            attributes,
            start: index,
            end: index,
            list_values: Vec::new(),
        });
        Ok(self.params.len() - 1)
    }

    fn close(&mut self, frame: Frame, index: usize) {
        if let Some(element) = frame.element.and_then(|i| self.params.get_mut(i)) {
            element.end = index;
            if element.tag == ParamTag::Node {
                self.node_path.pop();
            }
        }
    }

    fn info_text(&mut self, field: MetaField, text: &str) {
        let info = &mut self.info;
        let target = match field {
            MetaField::Name => &mut info.name,
            MetaField::Version => &mut info.version,
            MetaField::Category => &mut info.category,
            MetaField::DocUrl => &mut info.docurl,
            MetaField::Description => &mut info.description,
            MetaField::Manual => &mut info.manual,
            MetaField::ExecutableName => info.executable_name.get_or_insert_with(String::new),
            MetaField::ExecutablePath => info.executable_path.get_or_insert_with(String::new),
        };
        target.push_str(text);
    }

    fn finish(mut self) -> Result<Outline, CtdError> {
        if let Some(frame) = self.stack.last() {
            return Err(malformed(format!("element <{}> is never closed", frame.tag)));
        }
        if !self.has_parameters {
            return Err(malformed(format!("missing <{}> element", TAG_PARAMETERS)));
        }

        let info = &mut self.info;
        for field in [
            &mut info.name,
            &mut info.version,
            &mut info.category,
            &mut info.docurl,
            &mut info.description,
            &mut info.manual,
        ] {
            *field = field.trim().to_string();
        }
        for field in [&mut info.executable_name, &mut info.executable_path] {
            *field = field.take().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        }
        if info.name.is_empty() {
            return Err(malformed("the tool has no name"));
        }

        Ok(Outline {
            info: self.info,
            params: self.params,
            cli: self.cli,
        })
    }
}

fn read_attributes(start: &BytesStart<'_>) -> Result<IndexMap<String, String>, CtdError> {
    let mut attributes = IndexMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| malformed(e.to_string()))?
            .to_string();
        let value = attr.unescape_value().map_err(|e| malformed(e.to_string()))?;
        attributes.insert(key, value.into_owned());
    }
    Ok(attributes)
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tool name="Demo" version="1.0">
  <!-- keep me -->
  <description><![CDATA[Demo tool]]></description>
  <PARAMETERS>
    <ITEM name="x" value="1.5" type="double" description="a &amp; b"/>
    <NODE name="1" description="first">
      <ITEM name="n" type="int" value="3" />
      <ITEMLIST name="l" type="string">
        <LISTITEM value="a"/>
        <LISTITEM value="b"/>
      </ITEMLIST>
    </NODE>
  </PARAMETERS>
</tool>
"#;

    #[test]
    fn test_unmodified_document_round_trips_byte_for_byte() {
        let document = CtdDocument::parse(DOC).unwrap();
        assert_eq!(String::from_utf8(document.to_bytes().unwrap()).unwrap(), DOC);
    }

    #[test]
    fn test_outline_collects_paths_and_metadata() {
        let outline = CtdDocument::parse(DOC).unwrap().outline().unwrap();
        assert_eq!(outline.info.name, "Demo");
        assert_eq!(outline.info.version, "1.0");
        assert_eq!(outline.info.description, "Demo tool");

        let paths: Vec<String> = outline.params.iter().map(ParamElement::dotted_path).collect();
        assert_eq!(paths, ["x", "1", "1.n", "1.l"]);
        let x = outline.find("x").unwrap();
        assert_eq!(x.attr("description"), Some("a & b"));
        assert_eq!(outline.find("1.l").unwrap().list_values, ["a", "b"]);
        assert_eq!(outline.find("1.n").unwrap().parent_path(), "1");
        assert!(outline.find("1").is_none());
    }

    #[test]
    fn test_patch_attribute_only_touches_the_value() {
        let mut document = CtdDocument::parse(DOC).unwrap();
        let start = document.outline().unwrap().find("1.n").unwrap().start;
        document.patch_attribute(start, "value", "<42>").unwrap();
        let out = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert_eq!(
            out,
            DOC.replace(r#"value="3" />"#, r#"value="&lt;42&gt;" />"#)
        );
    }

    #[test]
    fn test_patch_attribute_appends_missing_attribute() {
        let xml = r#"<tool name="t"><PARAMETERS><ITEM name="a" type="string" /></PARAMETERS></tool>"#;
        let mut document = CtdDocument::parse(xml).unwrap();
        let start = document.outline().unwrap().find("a").unwrap().start;
        document.patch_attribute(start, "value", "v").unwrap();
        let out = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<tool name="t"><PARAMETERS><ITEM name="a" type="string" value="v" /></PARAMETERS></tool>"#
        );
    }

    #[test]
    fn test_structural_errors_are_malformed() {
        let cases = [
            r#"<tool name="t"><PARAMETERS><ITEM name="a" type="int" value="1">"#,
            r#"<PARAMETERS/>"#,
            r#"<tool name="t"/>"#,
            r#"<tool name="t"><PARAMETERS><LISTITEM value="1"/></PARAMETERS></tool>"#,
            r#"<tool name="t"><PARAMETERS><ITEM name="a" type="int"><ITEM name="b" type="int"/></ITEM></PARAMETERS></tool>"#,
            r#"<tool name="t"><PARAMETERS><ITEM type="int"/></PARAMETERS></tool>"#,
            r#"<tool name="t"><PARAMETERS><ITEM name="a" type="int"/><ITEM name="a" type="int"/></PARAMETERS></tool>"#,
            r#"<tool name="t"><PARAMETERS/><PARAMETERS/></tool>"#,
            r#"<tool><PARAMETERS/></tool>"#,
            r#"<tool name="t"><PARAMETERS></NODE></tool>"#,
        ];
        for xml in cases {
            assert!(
                matches!(CtdDocument::parse(xml), Err(CtdError::MalformedDocument { .. })),
                "expected a malformed document for {}",
                xml
            );
        }
    }

    #[test]
    fn test_cli_section_is_collected() {
        let xml = r#"<tool name="t">
  <PARAMETERS><ITEM name="a" type="int" value="1"/></PARAMETERS>
  <cli>
    <clielement optionIdentifier="-a" isList="false"><mapping referenceName="a"/></clielement>
    <clielement optionIdentifier="" isList="true"><mapping referenceName="a"/></clielement>
  </cli>
</tool>"#;
        let outline = CtdDocument::parse(xml).unwrap().outline().unwrap();
        assert_eq!(outline.cli.len(), 2);
        assert_eq!(outline.cli[0].option_identifier, "-a");
        assert_eq!(outline.cli[0].mappings, ["a"]);
        assert!(outline.cli[1].is_list);
    }
}
