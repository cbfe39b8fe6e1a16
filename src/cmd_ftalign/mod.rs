//! Subcommand modules for the `ftalign` binary.

pub mod align;
pub mod args;
pub mod matrix;
pub mod stat;
