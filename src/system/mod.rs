//! # System Interaction Layer
//!
//! This module is the boundary between the core logic and the operating
//! system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns the wrapped tool with an already assembled argument
//!   vector, inheriting the terminal's standard streams.

pub mod executor;
