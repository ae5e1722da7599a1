// src/cli/args.rs

use clap::Args;

/// Selects the document to load: a CTD file, a job file or `./ctdwrap.toml`.
#[derive(Args, Debug, Default, Clone)]
pub struct DocumentArgs {
    /// Job file to load. Defaults to `./ctdwrap.toml` when no document is given.
    #[arg(long, short)]
    pub job: Option<String>,
}

/// Options of the actions that edit parameter values.
#[derive(Args, Debug, Default, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Set a parameter value, e.g. `--set 1.2.z=1979`. Applied after the job file.
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,
}

/// Options of the actions that assemble the command line.
#[derive(Args, Debug, Default, Clone)]
pub struct InvocationArgs {
    #[command(flatten)]
    pub edits: EditArgs,

    /// Bind a file to a port, e.g. `--bind in=data.mzML`. Repeat for multi-file ports.
    #[arg(long = "bind", value_name = "PORT=FILE")]
    pub bind: Vec<String>,

    /// Directory in which unbound output ports get generated file names.
    #[arg(long)]
    pub outdir: Option<String>,

    /// Executable to run instead of the one declared by the document or job file.
    #[arg(long)]
    pub exe: Option<String>,
}

/// Splits a `KEY=VALUE` argument at the first `=`.
pub fn split_assignment(raw: &str) -> Option<(&str, &str)> {
    raw.split_once('=').filter(|(key, _)| !key.trim().is_empty())
}

// MARK: --- UNIT TESTS ---
