// src/cli/handlers/run.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::{args::InvocationArgs, handlers::commons},
    system::executor,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Assembles the command line and executes the tool."
)]
struct RunArgs {
    /// Print the command line before executing it.
    #[arg(long, short)]
    verbose: bool,

    #[command(flatten)]
    invocation: InvocationArgs,
}

/// The main handler for the `run` command.
pub fn handle(context: Option<String>, args: Vec<String>) -> Result<()> {
    let run_args = RunArgs::try_parse_from(&args)?;
    let mut invocation = commons::load_invocation(context, &run_args.invocation.edits.document)?;
    let (program, tokens) = commons::prepare_command(&mut invocation, &run_args.invocation)?;

    if run_args.verbose {
        eprintln!(
            "{} {}",
            "→".cyan(),
            executor::display_command_line(&program, &tokens)
        );
    }
    let cwd = commons::working_dir(&invocation);
    executor::execute_argv(&program, &tokens, cwd.as_deref())?;
    Ok(())
}
