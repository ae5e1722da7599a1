// src/system/executor.rs

use std::path::Path;
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use thiserror::Error;

/// Failures of running the wrapped tool.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No program specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with {status}.")]
    NonZeroExitStatus { command: String, status: ExitStatus },
}

/// Runs `program` with `args` passed verbatim (no shell involved) and waits for it.
///
/// Standard streams are inherited. A non-zero exit status is an error.
pub fn execute_argv(program: &str, args: &[String], cwd: Option<&Path>) -> Result<(), ExecutionError> {
    if program.trim().is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }

    let mut command = StdCommand::new(program);
    command
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(cwd) = cwd {
        command.current_dir(dunce::simplified(cwd));
    }

    log::debug!("Spawning '{}' with {} arguments", program, args.len());
    let status = command
        .status()
        .map_err(|e| ExecutionError::CommandFailed(program.to_string(), e))?;

    if status.success() {
        Ok(())
    } else {
        Err(ExecutionError::NonZeroExitStatus {
            command: program.to_string(),
            status,
        })
    }
}

/// Renders an argument vector as a single shell-quoted line, for display only.
pub fn display_command_line(program: &str, args: &[String]) -> String {
    let words = std::iter::once(program).chain(args.iter().map(String::as_str));
    shlex::try_join(words.clone()).unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "))
}

// MARK: --- UNIT TESTS ---
