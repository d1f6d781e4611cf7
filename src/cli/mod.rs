//! Command-line interface for slideflow.
//!
//! Provides commands for estimating library sizes, dry-running the
//! sampler, and playing a slideshow in the terminal without a hosting
//! widget.

mod commands;

pub use commands::{Cli, Commands, run_command};
