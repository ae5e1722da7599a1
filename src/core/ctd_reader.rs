// src/core/ctd_reader.rs

//! Reads a CTD document into a [`ParameterTree`], its input and output
//! [`Port`]s and the tool metadata.

use crate::{
    constants::*,
    core::{
        command_line::CliElement,
        ctd_document::{CtdDocument, CtdError, ParamElement, ParamTag},
        ctd_writer::CtdWriter,
        parameters::{FileDirection, FileRole, Parameter, ParameterError, ScalarKind, ValueKind},
        ports::Port,
        restrictions::Restriction,
        tree::ParameterTree,
    },
    models::ToolInfo,
};
use std::path::Path;

/// Everything the reader extracts from one CTD document.
#[derive(Debug, Clone)]
pub struct NodeConfiguration {
    info: ToolInfo,
    tree: ParameterTree,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    cli: Vec<CliElement>,
    document: CtdDocument,
}

impl NodeConfiguration {
    pub fn info(&self) -> &ToolInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut ToolInfo {
        &mut self.info
    }

    pub fn tree(&self) -> &ParameterTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ParameterTree {
        &mut self.tree
    }

    /// Input ports in declaration order.
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut [Port] {
        &mut self.inputs
    }

    /// Output ports in declaration order.
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut [Port] {
        &mut self.outputs
    }

    pub fn cli(&self) -> &[CliElement] {
        &self.cli
    }

    /// The source document, as retained for later rewriting.
    pub fn document(&self) -> &CtdDocument {
        &self.document
    }

    /// A writer bound to a snapshot of the source document.
    pub fn writer(&self) -> Result<CtdWriter, CtdError> {
        CtdWriter::new(self.document.clone())
    }
}

/// Reads a CTD document held in memory.
pub fn read(xml: &str) -> Result<NodeConfiguration, CtdError> {
    from_document(CtdDocument::parse(xml)?)
}

/// Reads the CTD document at `path`.
pub fn read_file(path: &Path) -> Result<NodeConfiguration, CtdError> {
    log::debug!("Reading CTD document '{}'", path.display());
    from_document(CtdDocument::from_path(path)?)
}

/// Builds the configuration from an already parsed document.
pub fn from_document(document: CtdDocument) -> Result<NodeConfiguration, CtdError> {
    let outline = document.outline()?;
    let mut tree = ParameterTree::new();

    for element in &outline.params {
        // Elements come in document order, so the enclosing section already exists.
        let parent = tree.resolve(&element.parent_path())?;
        match element.tag {
            ParamTag::Node => {
                let description = element.attr(ATTR_DESCRIPTION).unwrap_or_default();
                tree.insert_section(parent, element.name(), description)?;
            }
            ParamTag::Item | ParamTag::ItemList => {
                let parameter = build_parameter(element)?;
                log::trace!("Read parameter {}", parameter);
                tree.insert_parameter(parent, parameter)?;
            }
        }
    }

    for element in &outline.cli {
        for mapping in &element.mappings {
            if tree.get_leaf(mapping).is_err() {
                return Err(CtdError::UnknownParameterPath {
                    path: mapping.clone(),
                });
            }
        }
    }

    let (inputs, outputs) = derive_ports(&tree);
    log::debug!(
        "Read tool '{}': {} parameters, {} inputs, {} outputs",
        outline.info.name,
        tree.leaf_count(),
        inputs.len(),
        outputs.len()
    );

    Ok(NodeConfiguration {
        info: outline.info,
        tree,
        inputs,
        outputs,
        cli: outline.cli,
        document,
    })
}

/// Builds the parameter declared by an `ITEM` or `ITEMLIST`, holding the
/// document's value and flagged as defaulted.
pub(crate) fn build_parameter(element: &ParamElement) -> Result<Parameter, CtdError> {
    let path = element.dotted_path();
    let invalid = |source: ParameterError| CtdError::InvalidParameterValue {
        path: path.clone(),
        source,
    };

    let declared = element.attr(ATTR_TYPE).unwrap_or_default();
    let tags = split_list(element.attr(ATTR_TAGS).unwrap_or_default());
    let (scalar, role) =
        declared_type(declared, &tags).ok_or_else(|| CtdError::UnsupportedParameterType {
            path: path.clone(),
            declared: declared.to_string(),
        })?;
    let kind = match element.tag {
        ParamTag::ItemList => ValueKind::List(scalar),
        _ => ValueKind::Scalar(scalar),
    };

    let mut parameter = Parameter::empty(element.name(), kind);
    parameter.set_description(element.attr(ATTR_DESCRIPTION).unwrap_or_default());
    let section = element.parent_path();
    if !section.is_empty() {
        parameter.set_section(section);
    }
    let required = is_true(element.attr(ATTR_REQUIRED)) || tags.contains(&"required");
    parameter.set_optional(!required);
    parameter.set_advanced(is_true(element.attr(ATTR_ADVANCED)) || tags.contains(&"advanced"));

    match role {
        Some((direction, is_prefix)) => {
            let formats = element
                .attr(ATTR_SUPPORTED_FORMATS)
                .or_else(|| element.attr(ATTR_RESTRICTIONS))
                .map(|text| {
                    split_list(text)
                        .into_iter()
                        .map(|f| f.trim_start_matches('*').trim_start_matches('.').to_string())
                        .filter(|f| !f.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            parameter.set_file_role(Some(FileRole {
                direction,
                is_prefix,
                formats,
            }));
        }
        None => {
            if let Some(text) = element.attr(ATTR_RESTRICTIONS) {
                let restriction = Restriction::parse(kind, text).map_err(invalid)?;
                parameter.set_restriction(restriction).map_err(invalid)?;
            }
        }
    }

    let filled = match element.tag {
        ParamTag::ItemList => parameter.fill_from_elements(&element.list_values),
        _ => parameter.fill_from_string(element.attr(ATTR_VALUE).unwrap_or_default()),
    };
    filled.map_err(invalid)?;
    parameter.set_defaulted(true);
    Ok(parameter)
}

type FileRoleHint = Option<(FileDirection, bool)>;

fn declared_type(declared: &str, tags: &[&str]) -> Option<(ScalarKind, FileRoleHint)> {
    let parsed = match declared.trim() {
        "string" if tags.contains(&"input file") => (ScalarKind::File, Some((FileDirection::Input, false))),
        "string" if tags.contains(&"output file") => (ScalarKind::File, Some((FileDirection::Output, false))),
        "string" => (ScalarKind::String, None),
        "int" | "integer" => (ScalarKind::Int, None),
        "double" | "float" => (ScalarKind::Double, None),
        "bool" | "boolean" => (ScalarKind::Bool, None),
        "input-file" => (ScalarKind::File, Some((FileDirection::Input, false))),
        "output-file" => (ScalarKind::File, Some((FileDirection::Output, false))),
        "input-prefix" => (ScalarKind::File, Some((FileDirection::Input, true))),
        "output-prefix" => (ScalarKind::File, Some((FileDirection::Output, true))),
        _ => return None,
    };
    Some(parsed)
}

fn split_list(text: &str) -> Vec<&str> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn is_true(flag: Option<&str>) -> bool {
    flag.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Ports follow the declaration order of their file parameters.
fn derive_ports(tree: &ParameterTree) -> (Vec<Port>, Vec<Port>) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (path, parameter) in tree.leaves() {
        let Some(role) = parameter.file_role() else {
            continue;
        };
        let mut port = Port::new(path);
        port.set_description(parameter.description());
        for format in &role.formats {
            port.add_mime_type(format.clone());
        }
        port.set_optional(parameter.is_optional());
        port.set_multi_file(parameter.kind().is_list());
        port.set_prefix(role.is_prefix);
        match role.direction {
            FileDirection::Input => inputs.push(port),
            FileDirection::Output => outputs.push(port),
        }
    }
    (inputs, outputs)
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::Value;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tool name="PeakPicker" version="2.1" category="Signal processing">
  <description>Finds peaks.</description>
  <executableName>PeakPickerHiRes</executableName>
  <PARAMETERS>
    <ITEM name="in" value="" type="input-file" required="true" supported_formats="*.mzML,*.mzXML" description="input"/>
    <ITEMLIST name="extra" type="input-file" supported_formats="*.mzML"/>
    <NODE name="algo" description="Algorithm section">
      <ITEM name="threads" value="4" type="int" restrictions="1:" advanced="true"/>
      <ITEM name="mode" value="fast" type="string" restrictions="fast,slow"/>
      <ITEM name="ratio" value="0.5" type="double"/>
      <ITEM name="verbose" value="TRUE" type="bool"/>
      <ITEM name="log" value="" type="string" tags="output file,required"/>
      <ITEMLIST name="ids" type="int">
        <LISTITEM value="1"/>
        <LISTITEM value="2"/>
      </ITEMLIST>
    </NODE>
    <ITEM name="out" value="" type="output-prefix"/>
  </PARAMETERS>
</tool>
"#;

    #[test]
    fn test_read_builds_tree_in_document_order() {
        let config = read(DOC).unwrap();
        let paths: Vec<String> = config.tree().leaves().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            ["in", "extra", "algo.threads", "algo.mode", "algo.ratio", "algo.verbose", "algo.log", "algo.ids", "out"]
        );
        let algo = config.tree().resolve("algo").unwrap();
        assert_eq!(config.tree().section(algo).unwrap().description(), "Algorithm section");
    }

    #[test]
    fn test_read_types_values_and_flags() {
        let config = read(DOC).unwrap();
        let tree = config.tree();

        let threads = tree.get_leaf("algo.threads").unwrap();
        assert_eq!(threads.value(), Some(&Value::Int(4)));
        assert!(threads.is_advanced());
        assert!(threads.is_defaulted());
        assert_eq!(threads.section(), "algo");
        assert!(!threads.validate(&Value::Int(0)));

        assert_eq!(tree.get_leaf("algo.verbose").unwrap().value(), Some(&Value::Bool(true)));
        assert_eq!(tree.get_leaf("algo.ids").unwrap().value(), Some(&Value::IntList(vec![1, 2])));
        assert_eq!(tree.get_leaf("algo.ratio").unwrap().string_rep(), "0.5");

        let input = tree.get_leaf("in").unwrap();
        assert!(!input.is_optional());
        assert!(input.is_null());
        assert_eq!(input.section(), "default");

        let log = tree.get_leaf("algo.log").unwrap();
        assert!(log.kind().is_file());
        assert!(!log.is_optional());
    }

    #[test]
    fn test_read_derives_ports_and_metadata() {
        let config = read(DOC).unwrap();
        assert_eq!(config.info().name, "PeakPicker");
        assert_eq!(config.info().version, "2.1");
        assert_eq!(config.info().description, "Finds peaks.");
        assert_eq!(config.info().program(), "PeakPickerHiRes");

        let inputs: Vec<&str> = config.inputs().iter().map(Port::name).collect();
        assert_eq!(inputs, ["in", "extra"]);
        assert_eq!(config.inputs()[0].mime_types(), ["mzML", "mzXML"]);
        assert!(!config.inputs()[0].is_optional());
        assert!(config.inputs()[1].is_multi_file());

        let outputs: Vec<&str> = config.outputs().iter().map(Port::name).collect();
        assert_eq!(outputs, ["algo.log", "out"]);
        assert!(config.outputs()[1].is_prefix());
    }

    #[test]
    fn test_read_is_deterministic() {
        let first = read(DOC).unwrap();
        let second = read(DOC).unwrap();
        assert_eq!(first.tree(), second.tree());
        assert_eq!(first.inputs(), second.inputs());
    }

    #[test]
    fn test_unsupported_type_fails() {
        let xml = r#"<tool name="t"><PARAMETERS><NODE name="n"><ITEM name="a" value="1" type="complex"/></NODE></PARAMETERS></tool>"#;
        match read(xml) {
            Err(CtdError::UnsupportedParameterType { path, declared }) => {
                assert_eq!(path, "n.a");
                assert_eq!(declared, "complex");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        let missing = r#"<tool name="t"><PARAMETERS><ITEM name="a" value="1"/></PARAMETERS></tool>"#;
        assert!(matches!(read(missing), Err(CtdError::UnsupportedParameterType { .. })));
    }

    #[test]
    fn test_invalid_document_value_fails() {
        let xml = r#"<tool name="t"><PARAMETERS><ITEM name="a" value="abc" type="int"/></PARAMETERS></tool>"#;
        assert!(matches!(read(xml), Err(CtdError::InvalidParameterValue { .. })));
        let restricted = r#"<tool name="t"><PARAMETERS><ITEM name="a" value="0" type="int" restrictions="1:"/></PARAMETERS></tool>"#;
        assert!(matches!(read(restricted), Err(CtdError::InvalidParameterValue { .. })));
    }

    #[test]
    fn test_cli_mapping_to_unknown_path_fails() {
        let xml = r#"<tool name="t">
  <PARAMETERS><ITEM name="a" value="1" type="int"/></PARAMETERS>
  <cli><clielement optionIdentifier="-b"><mapping referenceName="b"/></clielement></cli>
</tool>"#;
        assert!(matches!(read(xml), Err(CtdError::UnknownParameterPath { .. })));
    }
}
