// src/cli/dispatcher.rs

use anyhow::{Result, bail};

use crate::cli::handlers;

// --- Command Definition and Registry ---

/// Defines an action, its aliases, and its handler.
/// Handlers receive the optional context (a CTD document or job file) and their own arguments.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Option<String>, Vec<String>) -> Result<()>,
}

/// The single source of truth for all actions.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "info",
        aliases: &[],
        handler: handlers::info::handle,
    },
    CommandDefinition {
        name: "tree",
        aliases: &["ls"],
        handler: handlers::tree::handle,
    },
    CommandDefinition {
        name: "set",
        aliases: &[],
        handler: handlers::set::handle,
    },
    CommandDefinition {
        name: "cmdline",
        aliases: &["cmd"],
        handler: handlers::cmdline::handle,
    },
    CommandDefinition {
        name: "run",
        aliases: &[],
        handler: handlers::run::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Splits the raw arguments into the action, its context and its arguments.
fn route(all_args: &[String]) -> Result<(&'static CommandDefinition, Option<String>, Vec<String>)> {
    let Some((arg1, rest)) = all_args.split_first() else {
        bail!("No action given. Run `ctdwrap --help` for usage.");
    };

    if let Some(command) = find_command(arg1) {
        // `ctdwrap <action> [args...]`
        return Ok((command, None, rest.to_vec()));
    }
    match rest.split_first() {
        // `ctdwrap <context> <action> [args...]`
        Some((arg2, params)) => match find_command(arg2) {
            Some(command) => Ok((command, Some(arg1.clone()), params.to_vec())),
            None => bail!("Unknown action '{}'. Run `ctdwrap --help` for usage.", arg2),
        },
        // `ctdwrap <context>`
        None => match find_command("info") {
            Some(command) => Ok((command, Some(arg1.clone()), Vec::new())),
            None => bail!("The 'info' action is not registered."),
        },
    }
}

/// The main application dispatcher.
pub fn dispatch(all_args: Vec<String>) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);
    let (command, context, handler_args) = route(&all_args)?;
    log::debug!("Action '{}' with context {:?}", command.name, context);
    (command.handler)(context, handler_args)
}

// MARK: --- UNIT TESTS ---
