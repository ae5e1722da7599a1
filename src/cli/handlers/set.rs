// src/cli/handlers/set.rs

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

use crate::cli::{
    args::{EditArgs, split_assignment},
    handlers::commons,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Writes parameter values into the CTD document, leaving everything else untouched."
)]
struct SetArgs {
    /// Edits as PATH=VALUE, applied after the job file and `--set` edits.
    assignments: Vec<String>,

    /// Destination file. Defaults to standard output.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Overwrite the source document.
    #[arg(long, conflicts_with = "output")]
    in_place: bool,

    #[command(flatten)]
    edits: EditArgs,
}

/// The main handler for the `set` command.
pub fn handle(context: Option<String>, args: Vec<String>) -> Result<()> {
    let set_args = SetArgs::try_parse_from(&args)?;
    let invocation = commons::load_invocation(context, &set_args.edits.document)?;

    let mut edits = commons::parameter_edits(&invocation, &set_args.edits)?;
    for raw in &set_args.assignments {
        let (path, value) =
            split_assignment(raw).ok_or_else(|| anyhow!("Expected PATH=VALUE, got '{}'.", raw))?;
        edits.push((path.trim().to_string(), value.to_string()));
    }

    let mut writer = invocation.config.writer()?;
    for (path, value) in &edits {
        writer.set_parameter_value(path, value)?;
    }

    let destination = if set_args.in_place {
        Some(invocation.document_path.clone())
    } else {
        set_args.output
    };
    match destination {
        Some(path) => {
            writer.write(&path)?;
            eprintln!(
                "{} {} edit(s) written to '{}'.",
                "✔".green(),
                edits.len(),
                path.display()
            );
        }
        None => {
            let bytes = writer.to_bytes()?;
            std::io::stdout()
                .write_all(&bytes)
                .context("Failed to write the document to standard output")?;
        }
    }
    Ok(())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_accepts_only_edit_options() {
        let parsed = SetArgs::try_parse_from(["x=1", "--set", "1.2.z=3", "-j", "job.toml", "--in-place"]).unwrap();
        assert_eq!(parsed.assignments, ["x=1"]);
        assert_eq!(parsed.edits.set, ["1.2.z=3"]);
        assert_eq!(parsed.edits.document.job.as_deref(), Some("job.toml"));
        assert!(parsed.in_place);

        for rejected in [["--bind", "in=a.txt"], ["--outdir", "out"], ["--exe", "tool"]] {
            assert!(SetArgs::try_parse_from(rejected).is_err(), "{:?} should be rejected", rejected);
        }
        assert!(SetArgs::try_parse_from(["--in-place", "-o", "out.ctd"]).is_err());
    }
}
