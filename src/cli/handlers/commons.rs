// src/cli/handlers/commons.rs

// Shared loading logic for the handlers: locating the document and job file,
// applying edits and bindings, and assembling the command line.

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};

use crate::{
    cli::args::{DocumentArgs, EditArgs, InvocationArgs, split_assignment},
    constants::DEFAULT_JOB_FILENAME,
    core::{
        command_line::CommandLineAssembler,
        ctd_reader::{self, NodeConfiguration},
        job_loader::{Job, bind_generated_outputs},
        ports::PortBindings,
    },
    dev_utils,
};

/// A tool configuration loaded for one action.
#[derive(Debug)]
pub struct Invocation {
    pub config: NodeConfiguration,
    pub job: Option<Job>,
    pub document_path: PathBuf,
}

fn is_job_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Picks the job file: `--job` > a `.toml` context > `<cwd>/ctdwrap.toml` when
/// no context is given. A CTD context without `--job` loads no job file.
fn resolve_job_path(job: Option<&str>, context: Option<&str>, cwd: &Path) -> Result<Option<PathBuf>> {
    match (job, context) {
        (Some(job), _) => Ok(Some(expand(job))),
        (None, Some(ctx)) if is_job_file(ctx) => Ok(Some(expand(ctx))),
        (None, Some(_)) => Ok(None),
        (None, None) => {
            let default = cwd.join(DEFAULT_JOB_FILENAME);
            if default.is_file() {
                Ok(Some(default))
            } else {
                bail!(
                    "No CTD document given and no '{}' found in the current directory.",
                    DEFAULT_JOB_FILENAME
                );
            }
        }
    }
}

/// Resolves the context (a CTD document or a job file) and loads the configuration.
///
/// The document is the context when it is not a job file, otherwise the job's `ctd`.
/// The job's `executable` and `[port_options]` are applied to the result.
pub fn load_invocation(context: Option<String>, args: &DocumentArgs) -> Result<Invocation> {
    load_invocation_in(context, args, Path::new("."))
}

fn load_invocation_in(context: Option<String>, args: &DocumentArgs, cwd: &Path) -> Result<Invocation> {
    let _timer = dev_utils::BlockTimer::new("load_invocation");

    let job_path = resolve_job_path(args.job.as_deref(), context.as_deref(), cwd)?;
    let job = job_path.as_deref().map(Job::load).transpose()?;

    let document_path = match (&context, &job) {
        (Some(ctx), _) if !is_job_file(ctx) => expand(ctx),
        (_, Some(job)) => job
            .ctd_path()
            .ok_or_else(|| anyhow!("The job file does not name a CTD document (`ctd = ...`)."))?,
        _ => bail!("No CTD document to load."),
    };

    let mut config = ctd_reader::read_file(&document_path)
        .with_context(|| format!("Failed to load CTD document '{}'", document_path.display()))?;

    if let Some(job) = &job {
        if let Some(exe) = &job.config.executable {
            set_executable(&mut config, exe);
        }
        job.apply_port_options(&mut config)?;
    }

    Ok(Invocation {
        config,
        job,
        document_path,
    })
}

fn set_executable(config: &mut NodeConfiguration, exe: &str) {
    let info = config.info_mut();
    info.executable_name = Some(exe.to_string());
    info.executable_path = None;
}

/// Parameter edits from the job file followed by the `--set` arguments.
pub fn parameter_edits(invocation: &Invocation, args: &EditArgs) -> Result<Vec<(String, String)>> {
    let mut edits: Vec<(String, String)> = invocation
        .job
        .iter()
        .flat_map(|job| job.edits())
        .map(|(path, value)| (path.to_string(), value.to_string()))
        .collect();
    for raw in &args.set {
        let (path, value) =
            split_assignment(raw).ok_or_else(|| anyhow!("Expected PATH=VALUE, got '{}'.", raw))?;
        edits.push((path.trim().to_string(), value.to_string()));
    }
    Ok(edits)
}

/// Port bindings from the job file, overridden port by port by `--bind`.
/// Unbound outputs get generated names when `--outdir` or the job's
/// `output_dir` is set, `--outdir` taking precedence.
pub fn port_bindings(invocation: &Invocation, args: &InvocationArgs) -> Result<PortBindings> {
    let mut bindings = invocation.job.as_ref().map(Job::bindings).unwrap_or_default();

    let mut overrides = PortBindings::new();
    for raw in &args.bind {
        let (port, file) =
            split_assignment(raw).ok_or_else(|| anyhow!("Expected PORT=FILE, got '{}'.", raw))?;
        overrides.bind(port.trim(), expand(file));
    }
    for (port, files) in overrides.iter() {
        bindings.bind_all(port, files.to_vec());
    }

    let output_dir = args
        .outdir
        .as_deref()
        .map(expand)
        .or_else(|| invocation.job.as_ref().and_then(Job::output_dir));
    if let Some(dir) = output_dir {
        bind_generated_outputs(&invocation.config, &mut bindings, &dir);
    }
    Ok(bindings)
}

/// Applies edits, bindings and `--exe`, then assembles `(program, arguments)`.
pub fn prepare_command(invocation: &mut Invocation, args: &InvocationArgs) -> Result<(String, Vec<String>)> {
    if let Some(exe) = &args.exe {
        set_executable(&mut invocation.config, exe);
    }
    for (path, value) in parameter_edits(invocation, &args.edits)? {
        invocation.config.tree_mut().set_value_at_path(&path, &value)?;
    }
    let bindings = port_bindings(invocation, args)?;
    let tokens = CommandLineAssembler::from_configuration(&invocation.config)
        .assemble(&bindings)
        .with_context(|| format!("Cannot build the command line of '{}'", invocation.config.info().name))?;
    Ok((invocation.config.info().program(), tokens))
}

/// Working directory for `run`: the job's `working_dir`, if any.
pub fn working_dir(invocation: &Invocation) -> Option<PathBuf> {
    invocation.job.as_ref().and_then(Job::working_dir)
}

// MARK: --- UNIT TESTS ---
