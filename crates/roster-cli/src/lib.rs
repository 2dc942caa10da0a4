//! Roster CLI library
//!
//! Command-line surface of roster: argument parsing, the terminal prompter,
//! operator-facing output and one module per subcommand.

pub mod cli;
pub mod commands;
pub mod output;
pub mod prompt;
