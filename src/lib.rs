//! `ctdwrap` turns Common Tool Descriptor (CTD) documents into typed,
//! editable parameter trees, rewrites edited values back into the source
//! document and assembles the argument vector used to invoke the tool.

/// Command-line front end.
pub mod cli;
pub mod constants;
/// CTD reading, writing and command-line assembly.
pub mod core;
pub mod dev_utils;
/// Tool metadata and job file models.
pub mod models;
/// Process execution.
pub mod system;
