// src/core/mod.rs

/// Argument vector assembly.
pub mod command_line;
/// Parsed, editable CTD documents.
pub mod ctd_document;
pub mod ctd_reader;
pub mod ctd_writer;
/// ASCII rendering of the parameter tree.
pub mod graph_display;
/// `ctdwrap.toml` job files.
pub mod job_loader;
/// Typed parameter values.
pub mod parameters;
/// Input and output file ports.
pub mod ports;
pub mod restrictions;
/// The configuration tree.
pub mod tree;
