// src/core/ports.rs

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasons a set of port bindings is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("No port named '{port}' is declared by the tool.")]
    UnknownPort { port: String },
    #[error("Port '{port}' accepts a single file but {count} were bound.")]
    TooManyFiles { port: String, count: usize },
    #[error("File '{file}' does not match the formats accepted by port '{port}' ({formats}).")]
    UnsupportedFormat {
        port: String,
        file: String,
        formats: String,
    },
}

/// A named input or output file slot of the wrapped tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    name: String,
    description: String,
    mime_types: Vec<String>,
    is_optional: bool,
    is_active: bool,
    is_multi_file: bool,
    is_prefix: bool,
    linked_port_index: i32,
    user_basename: Option<String>,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            mime_types: Vec::new(),
            is_optional: false,
            is_active: true,
            is_multi_file: false,
            is_prefix: false,
            linked_port_index: -1,
            user_basename: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Registers an accepted type. The registry is append-only: order is kept
    /// and duplicates are allowed.
    pub fn add_mime_type(&mut self, mime_type: impl Into<String>) {
        self.mime_types.push(mime_type.into());
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    pub fn set_optional(&mut self, is_optional: bool) {
        self.is_optional = is_optional;
    }

    /// Only meaningful for optional output ports.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    pub fn is_multi_file(&self) -> bool {
        self.is_multi_file
    }

    pub fn set_multi_file(&mut self, is_multi_file: bool) {
        self.is_multi_file = is_multi_file;
    }

    pub fn is_prefix(&self) -> bool {
        self.is_prefix
    }

    pub fn set_prefix(&mut self, is_prefix: bool) {
        self.is_prefix = is_prefix;
    }

    /// Index into the opposite port list, `-1` when unset.
    pub fn linked_port_index(&self) -> i32 {
        self.linked_port_index
    }

    pub fn set_linked_port_index(&mut self, index: i32) {
        self.linked_port_index = index;
    }

    pub fn user_basename(&self) -> Option<&str> {
        self.user_basename.as_deref()
    }

    pub fn set_user_basename(&mut self, basename: Option<String>) {
        self.user_basename = basename;
    }

    /// Whether `file` carries one of the accepted extensions (case-insensitive).
    /// A port without declared types accepts everything.
    pub fn accepts(&self, file: &Path) -> bool {
        if self.mime_types.is_empty() || self.is_prefix {
            return true;
        }
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.mime_types
            .iter()
            .any(|ext| file_name.ends_with(&format!(".{}", ext.to_lowercase())))
    }
}

/// Derives the file name for an output port.
///
/// The base name is taken from the user basename, the stem of the linked input
/// file, or the port name, in that order. Multi-file ports append `_<index>`;
/// non-prefix ports get the first declared type as extension.
pub fn derive_output_name(port: &Port, linked_input: Option<&Path>, index: usize) -> String {
    let base = port
        .user_basename()
        .map(str::to_string)
        .or_else(|| {
            linked_input
                .and_then(Path::file_stem)
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| port.name().replace('.', "_"));

    let mut name = if port.is_multi_file() {
        format!("{}_{}", base, index)
    } else {
        base
    };

    if !port.is_prefix()
        && let Some(ext) = port.mime_types().first()
    {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Files bound to ports, keyed by port name in binding order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBindings {
    files: IndexMap<String, Vec<PathBuf>>,
}

impl PortBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `file` to the files bound to `port`.
    pub fn bind(&mut self, port: impl Into<String>, file: impl Into<PathBuf>) {
        self.files.entry(port.into()).or_default().push(file.into());
    }

    /// Replaces every file bound to `port`.
    pub fn bind_all(&mut self, port: impl Into<String>, files: Vec<PathBuf>) {
        self.files.insert(port.into(), files);
    }

    /// Files bound to `port`, empty when unbound.
    pub fn files(&self, port: &str) -> &[PathBuf] {
        self.files.get(port).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_bound(&self, port: &str) -> bool {
        !self.files(port).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Checks every binding against the declared ports.
    pub fn validate<'p>(&self, ports: impl IntoIterator<Item = &'p Port> + Clone) -> Result<(), BindingError> {
        for (name, files) in &self.files {
            let port = ports
                .clone()
                .into_iter()
                .find(|p| p.name() == name)
                .ok_or_else(|| BindingError::UnknownPort { port: name.clone() })?;

            if !port.is_multi_file() && files.len() > 1 {
                return Err(BindingError::TooManyFiles {
                    port: name.clone(),
                    count: files.len(),
                });
            }
            if let Some(file) = files.iter().find(|f| !port.accepts(f)) {
                return Err(BindingError::UnsupportedFormat {
                    port: name.clone(),
                    file: file.display().to_string(),
                    formats: port.mime_types().join(", "),
                });
            }
        }
        Ok(())
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn output_port(name: &str, types: &[&str]) -> Port {
        let mut port = Port::new(name);
        for t in types {
            port.add_mime_type(*t);
        }
        port
    }

    #[test]
    fn test_port_defaults() {
        let port = Port::new("in");
        assert_eq!(port.linked_port_index(), -1);
        assert!(port.is_active());
        assert!(port.user_basename().is_none());
        assert!(port.mime_types().is_empty());
    }

    #[test]
    fn test_mime_types_keep_order_and_duplicates() {
        let port = output_port("out", &["mzML", "idXML", "mzML"]);
        assert_eq!(port.mime_types(), ["mzML", "idXML", "mzML"]);
    }

    #[test]
    fn test_accepts_checks_extension_case_insensitively() {
        let port = output_port("in", &["mzML"]);
        assert!(port.accepts(Path::new("/data/run1.MZML")));
        assert!(!port.accepts(Path::new("/data/run1.txt")));
        assert!(Port::new("any").accepts(Path::new("whatever.bin")));
    }

    #[test]
    fn test_derive_output_name_priorities() {
        let mut port = output_port("tool.out", &["idXML"]);
        assert_eq!(derive_output_name(&port, None, 0), "tool_out.idXML");
        assert_eq!(
            derive_output_name(&port, Some(Path::new("/x/sample.mzML")), 0),
            "sample.idXML"
        );
        port.set_user_basename(Some("result".to_string()));
        assert_eq!(
            derive_output_name(&port, Some(Path::new("/x/sample.mzML")), 0),
            "result.idXML"
        );
        port.set_multi_file(true);
        assert_eq!(derive_output_name(&port, None, 2), "result_2.idXML");
        port.set_prefix(true);
        assert_eq!(derive_output_name(&port, None, 1), "result_1");
    }

    #[test]
    fn test_bindings_validation() {
        let single = output_port("in", &["txt"]);
        let mut multi = output_port("many", &[]);
        multi.set_multi_file(true);
        let ports = [single, multi];

        let mut ok = PortBindings::new();
        ok.bind("in", "a.txt");
        ok.bind("many", "x");
        ok.bind("many", "y");
        assert!(ok.validate(&ports).is_ok());
        assert_eq!(ok.files("many").len(), 2);

        let mut too_many = PortBindings::new();
        too_many.bind_all("in", vec!["a.txt".into(), "b.txt".into()]);
        assert!(matches!(
            too_many.validate(&ports),
            Err(BindingError::TooManyFiles { count: 2, .. })
        ));

        let mut unknown = PortBindings::new();
        unknown.bind("nope", "a.txt");
        assert!(matches!(
            unknown.validate(&ports),
            Err(BindingError::UnknownPort { .. })
        ));

        let mut wrong = PortBindings::new();
        wrong.bind("in", "a.csv");
        assert!(matches!(
            wrong.validate(&ports),
            Err(BindingError::UnsupportedFormat { .. })
        ));
    }
}
