//! CLI module for routebook - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
