// src/cli/mod.rs

use clap::Parser;

pub mod args;
pub mod dispatcher;
pub mod handlers;

const AFTER_HELP: &str = "\
Grammar:
  ctdwrap <action> [args...]               uses --job or ./ctdwrap.toml
  ctdwrap <tool.ctd|job.toml> <action> [args...]
  ctdwrap <tool.ctd|job.toml>              shortcut for `info`

Actions:
  info      Show tool metadata and ports
  tree      Show the parameter tree (alias: ls)
  set       Rewrite parameter values into the document
  cmdline   Print the assembled command line
  run       Assemble the command line and execute the tool

Run `ctdwrap <action> --help` for the options of one action.";

/// ctdwrap: wraps command-line tools described by CTD documents.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = AFTER_HELP,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
/// Top-level arguments: an optional context followed by the action and its options.
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The sequence of arguments passed to ctdwrap. Parsed by the dispatcher.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
