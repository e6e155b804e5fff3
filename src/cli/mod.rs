//! CLI layer for codelode.
//!
//! Provides the command-line interface using clap, with commands for
//! building the index, linking the chunk graph, and querying it.

pub mod commands;
pub mod parser;

pub use commands::{execute, render_hits_text};
pub use parser::{Cli, Commands};
