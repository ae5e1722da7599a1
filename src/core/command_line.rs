// src/core/command_line.rs

//! Turns a populated [`ParameterTree`] and its port bindings into the argument
//! vector of the wrapped tool.

use crate::core::{
    ctd_reader::NodeConfiguration,
    parameters::{Parameter, Value},
    ports::{BindingError, Port, PortBindings},
    tree::ParameterTree,
};
use thiserror::Error;

/// Failures while turning a tree into an argument vector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Required parameter '{path}' has no value.")]
    MissingRequiredParameter { path: String },
    #[error("The command line refers to the unknown parameter '{path}'.")]
    UnknownParameterPath { path: String },
    #[error("Invalid port binding: {0}")]
    InvalidBinding(#[from] BindingError),
}

/// One entry of the command line: an option identifier (prefix), an optional
/// suffix and the parameters rendered after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliElement {
    /// Literal prefix. A prefix ending in `=` is joined with each value into one token.
    pub option_identifier: String,
    pub suffix: String,
    /// Renders the prefix once followed by every value, instead of once per value.
    pub is_list: bool,
    /// Dotted paths of the parameters this element renders.
    pub mappings: Vec<String>,
}

impl CliElement {
    pub fn new(option_identifier: impl Into<String>, mapping: impl Into<String>) -> Self {
        Self {
            option_identifier: option_identifier.into(),
            suffix: String::new(),
            is_list: false,
            mappings: vec![mapping.into()],
        }
    }
}

/// Assembles the argument vector of one tool from its tree, ports and `<cli>` section.
#[derive(Debug, Clone)]
pub struct CommandLineAssembler<'a> {
    tree: &'a ParameterTree,
    inputs: &'a [Port],
    outputs: &'a [Port],
    elements: Vec<CliElement>,
}

impl<'a> CommandLineAssembler<'a> {
    /// Uses `cli` when it is not empty, otherwise one `-<dotted.path>` element
    /// per parameter in tree order.
    pub fn new(tree: &'a ParameterTree, inputs: &'a [Port], outputs: &'a [Port], cli: &[CliElement]) -> Self {
        let elements = if cli.is_empty() {
            default_elements(tree)
        } else {
            cli.to_vec()
        };
        Self {
            tree,
            inputs,
            outputs,
            elements,
        }
    }

    /// Assembler over everything a [`NodeConfiguration`] holds.
    pub fn from_configuration(config: &'a NodeConfiguration) -> Self {
        Self::new(config.tree(), config.inputs(), config.outputs(), config.cli())
    }

    pub fn elements(&self) -> &[CliElement] {
        &self.elements
    }

    /// Produces the token sequence. The tree is never modified, so a failed
    /// assembly can be retried after binding the missing value.
    pub fn assemble(&self, bindings: &PortBindings) -> Result<Vec<String>, AssemblyError> {
        bindings.validate(self.inputs.iter().chain(self.outputs.iter()))?;

        let mut tokens = Vec::new();
        for element in &self.elements {
            for path in &element.mappings {
                self.render(element, path, bindings, &mut tokens)?;
            }
        }
        log::debug!("Assembled {} command line tokens", tokens.len());
        Ok(tokens)
    }

    fn render(
        &self,
        element: &CliElement,
        path: &str,
        bindings: &PortBindings,
        tokens: &mut Vec<String>,
    ) -> Result<(), AssemblyError> {
        let parameter = self
            .tree
            .get_leaf(path)
            .map_err(|_| AssemblyError::UnknownParameterPath {
                path: path.to_string(),
            })?;

        // Only optional outputs can be switched off.
        if let Some(port) = self.outputs.iter().find(|port| port.name() == path)
            && port.is_optional()
            && !port.is_active()
        {
            log::trace!("Skipping inactive output port '{}'", path);
            return Ok(());
        }

        let bound = bindings.files(path);
        let mut values: Vec<String> = if bound.is_empty() {
            match parameter.value() {
                Some(Value::Bool(flag)) if is_flag(element) => {
                    if *flag {
                        tokens.push(element.option_identifier.clone());
                    }
                    return Ok(());
                }
                Some(value) => value.elements(),
                None => Vec::new(),
            }
        } else {
            bound.iter().map(|file| file.display().to_string()).collect()
        };
        // An empty string is the unset value of string and file parameters.
        values.retain(|v| !v.is_empty());

        if values.is_empty() {
            return missing_unless_optional(parameter, path);
        }
        emit(element, &values, tokens);
        Ok(())
    }
}

fn is_flag(element: &CliElement) -> bool {
    !element.option_identifier.is_empty() && !element.option_identifier.ends_with('=')
}

fn missing_unless_optional(parameter: &Parameter, path: &str) -> Result<(), AssemblyError> {
    if parameter.is_optional() {
        Ok(())
    } else {
        Err(AssemblyError::MissingRequiredParameter {
            path: path.to_string(),
        })
    }
}

fn emit(element: &CliElement, values: &[String], tokens: &mut Vec<String>) {
    let prefix = element.option_identifier.as_str();
    let suffix = element.suffix.as_str();

    if prefix.ends_with('=') {
        tokens.extend(values.iter().map(|v| format!("{}{}{}", prefix, v, suffix)));
        return;
    }

    let mut push_bracketed = |chunk: &[String]| {
        if !prefix.is_empty() {
            tokens.push(prefix.to_string());
        }
        tokens.extend(chunk.iter().cloned());
        if !suffix.is_empty() {
            tokens.push(suffix.to_string());
        }
    };
    if element.is_list {
        push_bracketed(values);
    } else {
        for value in values.chunks(1) {
            push_bracketed(value);
        }
    }
}

fn default_elements(tree: &ParameterTree) -> Vec<CliElement> {
    tree.leaves()
        .into_iter()
        .map(|(path, parameter)| CliElement {
            option_identifier: format!("-{}", path),
            suffix: String::new(),
            is_list: parameter.kind().is_list(),
            mappings: vec![path],
        })
        .collect()
}

// MARK: --- UNIT TESTS ---
