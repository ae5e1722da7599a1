// src/cli/handlers/tree.rs

use anyhow::Result;
use clap::Parser;

use crate::{
    cli::{args::EditArgs, handlers::commons},
    core::graph_display::{self, DisplayOptions},
};
use colored::Colorize;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Displays the parameter tree of the tool."
)]
struct TreeArgs {
    /// Include advanced parameters.
    #[arg(long, short)]
    advanced: bool,

    /// Show parameter and section descriptions.
    #[arg(long, short)]
    descriptions: bool,

    /// Show everything (advanced parameters and descriptions).
    #[arg(long)]
    all: bool,

    /// Apply the job file and `--set` edits before displaying.
    #[arg(long)]
    edited: bool,

    #[command(flatten)]
    edits: EditArgs,
}

/// The main handler for the `tree` command.
pub fn handle(context: Option<String>, args: Vec<String>) -> Result<()> {
    // 1. Parse this handler's specific arguments.
    let tree_args = TreeArgs::try_parse_from(&args)?;

    // 2. Load the configuration, optionally with the edits applied.
    let mut invocation = commons::load_invocation(context, &tree_args.edits.document)?;
    if tree_args.edited {
        for (path, value) in commons::parameter_edits(&invocation, &tree_args.edits)? {
            invocation.config.tree_mut().set_value_at_path(&path, &value)?;
        }
    }

    // 3. Set display options based on flags.
    let display_options = DisplayOptions {
        show_advanced: tree_args.advanced || tree_args.all,
        show_descriptions: tree_args.descriptions || tree_args.all,
    };

    // 4. Delegate to the graph display module for rendering.
    println!("\nParameters of '{}':", invocation.config.info().name.cyan());
    print!(
        "{}",
        graph_display::render_parameter_tree(invocation.config.tree(), &display_options)
    );
    Ok(())
}
