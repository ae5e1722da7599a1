// src/models.rs

use indexmap::IndexMap;
use serde::Deserialize;

// --- TOOL METADATA ---

/// Tool-level metadata declared by a CTD document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub manual: String,
    pub category: String,
    pub docurl: String,
    /// Executable to invoke; falls back to `name` when absent.
    pub executable_name: Option<String>,
    pub executable_path: Option<String>,
}

impl ToolInfo {
    /// The program to put in front of the assembled argument vector.
    pub fn program(&self) -> String {
        match (&self.executable_path, &self.executable_name) {
            (Some(dir), Some(exe)) if !dir.is_empty() => {
                std::path::Path::new(dir).join(exe).display().to_string()
            }
            (_, Some(exe)) if !exe.is_empty() => exe.clone(),
            _ => self.name.clone(),
        }
    }
}

// --- JOB FILE MODELS (What is read from a `ctdwrap.toml`) ---

/// One or several files bound to a port. Uses `untagged` so a single string is accepted.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortFiles {
    Single(String),
    Many(Vec<String>),
}

impl PortFiles {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(file) => vec![file.clone()],
            Self::Many(files) => files.clone(),
        }
    }
}

/// Per-port settings used for output name derivation and activation.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PortOptions {
    /// Base name for generated output files.
    pub basename: Option<String>,
    /// Index of the input port whose file names seed generated output names.
    pub linked_input: Option<usize>,
    /// Deactivates an optional output port when `false`.
    pub active: Option<bool>,
}

/// Represents the deserialized structure of a job file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Path of the CTD document, relative to the job file.
    pub ctd: Option<String>,
    /// Overrides the executable declared by the document.
    pub executable: Option<String>,
    /// Working directory for `run`, relative to the job file.
    pub working_dir: Option<String>,
    /// Directory where unbound output ports get generated file names.
    pub output_dir: Option<String>,
    /// Parameter edits: dotted path -> string value, applied in file order.
    #[serde(default)]
    pub params: IndexMap<String, String>,
    /// Port bindings: port name -> file(s).
    #[serde(default)]
    pub ports: IndexMap<String, PortFiles>,
    #[serde(default)]
    pub port_options: IndexMap<String, PortOptions>,
}
