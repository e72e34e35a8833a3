//! Library half of the `binprep` CLI.
//!
//! Each subcommand is a plain function in `commands` so it can be exercised
//! from tests without spawning the binary.

pub mod commands;
pub mod logging;
