// src/cli/handlers/info.rs

use crate::{
    cli::{args::DocumentArgs, handlers::commons},
    core::ports::Port,
};
use anyhow::Result;
use clap::Parser;
use colored::*;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Displays the tool metadata and its input and output ports."
)]
struct InfoArgs {
    #[command(flatten)]
    document: DocumentArgs,
}

/// The main handler for the `info` command.
pub fn handle(context: Option<String>, args: Vec<String>) -> Result<()> {
    let info_args = InfoArgs::try_parse_from(&args)?;
    let invocation = commons::load_invocation(context, &info_args.document)?;
    let config = &invocation.config;
    let info = config.info();

    println!("\n--- Tool '{}' ---", info.name.yellow());
    let rows = [
        ("Version", info.version.clone()),
        ("Category", info.category.clone()),
        ("Executable", info.program()),
        ("Document", invocation.document_path.display().to_string()),
        ("Docs", info.docurl.clone()),
        ("Parameters", config.tree().leaf_count().to_string()),
    ];
    for (label, value) in rows.iter().filter(|(_, v)| !v.is_empty()) {
        println!("  {:<12} {}", label.blue(), value);
    }
    if !info.description.is_empty() {
        println!("\n  {}", info.description);
    }

    print_ports("Inputs", config.inputs());
    print_ports("Outputs", config.outputs());
    println!("\n---------------------------------");
    Ok(())
}

fn print_ports(title: &str, ports: &[Port]) {
    println!("\n{}:", title.green().bold());
    if ports.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    for port in ports {
        let mut flags = Vec::new();
        if !port.is_optional() {
            flags.push("required");
        }
        if port.is_multi_file() {
            flags.push("multi");
        }
        if port.is_prefix() {
            flags.push("prefix");
        }
        if !port.is_active() {
            flags.push("inactive");
        }
        let formats = if port.mime_types().is_empty() {
            "*".to_string()
        } else {
            port.mime_types().join(", ")
        };
        println!(
            "  {:<24} [{}] {}",
            port.name().cyan(),
            formats,
            flags.join(" ").dimmed()
        );
    }
}
