// src/cli/handlers/mod.rs

// This module contains the logic for each CLI action.

pub mod cmdline;
pub mod commons;
pub mod info;
pub mod run;
pub mod set;
pub mod tree;
