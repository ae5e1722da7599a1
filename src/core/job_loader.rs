// src/core/job_loader.rs

//! # Job Loader
//!
//! A job file (`ctdwrap.toml`) names the CTD document to wrap and the values,
//! port bindings and port options of one concrete invocation. Relative paths
//! inside it are resolved against the directory holding the job file, after
//! `~` expansion.

use crate::{
    core::{
        ctd_reader::NodeConfiguration,
        ports::{PortBindings, derive_output_name},
        tree::{ParameterTree, TreeError},
    },
    models::JobConfig,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised while loading or applying a job file.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Failed to read job file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse job file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Port options refer to '{port}', which the tool does not declare.")]
    UnknownPort { port: String },
    #[error("Input port '{port}' cannot be deactivated; only optional outputs can.")]
    InactiveInput { port: String },
    #[error("Port '{port}' is linked to input #{index}, but the tool has {available} input ports.")]
    InvalidLink {
        port: String,
        index: usize,
        available: usize,
    },
}

/// A loaded job file together with the directory its relative paths start from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    pub config: JobConfig,
    pub base_dir: PathBuf,
}

impl Job {
    /// Reads and parses the job file at `path`.
    pub fn load(path: &Path) -> Result<Self, JobError> {
        log::debug!("Loading job file '{}'", path.display());
        let text = fs::read_to_string(path).map_err(|source| JobError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: JobConfig = toml::from_str(&text).map_err(|source| JobError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self { config, base_dir })
    }

    /// Expands `~` and anchors relative paths at the job file's directory.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }

    pub fn ctd_path(&self) -> Option<PathBuf> {
        self.config.ctd.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        self.config.working_dir.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.config.output_dir.as_deref().map(|p| self.resolve_path(p))
    }

    /// Parameter edits in file order.
    pub fn edits(&self) -> impl Iterator<Item = (&str, &str)> {
        self.config
            .params
            .iter()
            .map(|(path, value)| (path.as_str(), value.as_str()))
    }

    /// Stores every `[params]` value in `tree`, stopping at the first failure.
    pub fn apply_params(&self, tree: &mut ParameterTree) -> Result<(), TreeError> {
        for (path, value) in self.edits() {
            tree.set_value_at_path(path, value)?;
        }
        Ok(())
    }

    /// The `[ports]` table as resolved bindings.
    pub fn bindings(&self) -> PortBindings {
        let mut bindings = PortBindings::new();
        for (port, files) in &self.config.ports {
            let files = files.to_vec().iter().map(|f| self.resolve_path(f)).collect();
            bindings.bind_all(port.clone(), files);
        }
        bindings
    }

    /// Applies `[port_options]` to the matching ports of `config`.
    pub fn apply_port_options(&self, config: &mut NodeConfiguration) -> Result<(), JobError> {
        let input_count = config.inputs().len();
        for (name, options) in &self.config.port_options {
            let input = config.inputs().iter().position(|p| p.name() == name.as_str());
            let output = config.outputs().iter().position(|p| p.name() == name.as_str());
            if input.is_some() && options.active.is_some() {
                return Err(JobError::InactiveInput { port: name.clone() });
            }
            let port = match (input, output) {
                (Some(i), _) => config.inputs_mut().get_mut(i),
                (None, Some(i)) => config.outputs_mut().get_mut(i),
                (None, None) => None,
            }
            .ok_or_else(|| JobError::UnknownPort { port: name.clone() })?;

            if let Some(basename) = &options.basename {
                port.set_user_basename(Some(basename.clone()));
            }
            if let Some(active) = options.active {
                port.set_active(active);
            }
            if let Some(index) = options.linked_input {
                let linked = i32::try_from(index)
                    .ok()
                    .filter(|_| index < input_count)
                    .ok_or_else(|| JobError::InvalidLink {
                        port: name.clone(),
                        index,
                        available: input_count,
                    })?;
                port.set_linked_port_index(linked);
            }
        }
        Ok(())
    }
}

/// Binds generated file names inside `output_dir` to every active output port
/// that has no binding yet. Multi-file ports linked to an input get one file
/// per bound input file.
pub fn bind_generated_outputs(config: &NodeConfiguration, bindings: &mut PortBindings, output_dir: &Path) {
    for port in config.outputs() {
        if bindings.is_bound(port.name()) || (port.is_optional() && !port.is_active()) {
            continue;
        }
        let linked_files: Vec<PathBuf> = usize::try_from(port.linked_port_index())
            .ok()
            .and_then(|index| config.inputs().get(index))
            .map(|input| bindings.files(input.name()).to_vec())
            .unwrap_or_default();

        let count = if port.is_multi_file() {
            linked_files.len().max(1)
        } else {
            1
        };
        let files: Vec<PathBuf> = (0..count)
            .map(|index| {
                let linked = linked_files.get(index).map(PathBuf::as_path);
                output_dir.join(derive_output_name(port, linked, index))
            })
            .collect();
        log::debug!("Generated {} file name(s) for output port '{}'", files.len(), port.name());
        bindings.bind_all(port.name(), files);
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ctd_reader, parameters::Value};
    use std::path::Path;

    const DOC: &str = r#"<tool name="t">
  <PARAMETERS>
    <ITEM name="in" value="" type="input-file" required="true" supported_formats="*.mzML"/>
    <ITEM name="out" value="" type="output-file" supported_formats="*.idXML"/>
    <ITEM name="qc" value="" type="output-file" supported_formats="*.csv"/>
    <ITEM name="threads" value="1" type="int"/>
  </PARAMETERS>
</tool>"#;

    fn write_job(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("ctdwrap.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_resolves_paths_relative_to_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(
            dir.path(),
            r#"
ctd = "tools/t.ctd"
output_dir = "/abs/out"

[params]
threads = "8"

[ports]
in = "data/a.mzML"
"#,
        );
        let job = Job::load(&path).unwrap();
        assert_eq!(job.ctd_path().unwrap(), dir.path().join("tools/t.ctd"));
        assert_eq!(job.output_dir().unwrap(), PathBuf::from("/abs/out"));
        assert_eq!(job.bindings().files("in"), [dir.path().join("data/a.mzML")]);

        let mut config = ctd_reader::read(DOC).unwrap();
        job.apply_params(config.tree_mut()).unwrap();
        assert_eq!(config.tree().get_leaf("threads").unwrap().value(), Some(&Value::Int(8)));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(dir.path(), "ctd = \"a.ctd\"\nbogus = 1\n");
        assert!(matches!(Job::load(&path), Err(JobError::Parse { .. })));
    }

    #[test]
    fn test_port_options_and_generated_outputs() {
        let job: Job = Job {
            config: toml::from_str(
                r#"
[ports]
in = ["/data/sample.mzML"]

[port_options.out]
linked_input = 0

[port_options.qc]
active = false
"#,
            )
            .unwrap(),
            base_dir: PathBuf::from("/jobs"),
        };
        let mut config = ctd_reader::read(DOC).unwrap();
        job.apply_port_options(&mut config).unwrap();

        let mut bindings = job.bindings();
        bind_generated_outputs(&config, &mut bindings, Path::new("/results"));
        assert_eq!(bindings.files("out"), [PathBuf::from("/results/sample.idXML")]);
        assert!(!bindings.is_bound("qc"));
    }

    #[test]
    fn test_invalid_port_options() {
        let mut config = ctd_reader::read(DOC).unwrap();
        let unknown = Job {
            config: toml::from_str("[port_options.nope]\nactive = true\n").unwrap(),
            base_dir: PathBuf::new(),
        };
        assert!(matches!(
            unknown.apply_port_options(&mut config),
            Err(JobError::UnknownPort { .. })
        ));
        let inactive_input = Job {
            config: toml::from_str("[port_options.in]\nactive = false\n").unwrap(),
            base_dir: PathBuf::new(),
        };
        assert!(matches!(
            inactive_input.apply_port_options(&mut config),
            Err(JobError::InactiveInput { .. })
        ));
        assert!(config.inputs()[0].is_active());
        let bad_link = Job {
            config: toml::from_str("[port_options.out]\nlinked_input = 3\n").unwrap(),
            base_dir: PathBuf::new(),
        };
        assert!(matches!(
            bad_link.apply_port_options(&mut config),
            Err(JobError::InvalidLink { index: 3, .. })
        ));
    }
}
