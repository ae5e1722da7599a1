// src/cli/handlers/cmdline.rs

use anyhow::Result;
use clap::Parser;

use crate::{
    cli::{args::InvocationArgs, handlers::commons},
    system::executor,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints the command line that `run` would execute."
)]
struct CmdlineArgs {
    /// Print one unquoted token per line instead of a quoted command line.
    #[arg(long)]
    raw: bool,

    #[command(flatten)]
    invocation: InvocationArgs,
}

/// The main handler for the `cmdline` command.
pub fn handle(context: Option<String>, args: Vec<String>) -> Result<()> {
    let cmdline_args = CmdlineArgs::try_parse_from(&args)?;
    let mut invocation = commons::load_invocation(context, &cmdline_args.invocation.edits.document)?;
    let (program, tokens) = commons::prepare_command(&mut invocation, &cmdline_args.invocation)?;

    if cmdline_args.raw {
        println!("{}", program);
        for token in &tokens {
            println!("{}", token);
        }
    } else {
        println!("{}", executor::display_command_line(&program, &tokens));
    }
    Ok(())
}
