//! Core library for the eastconst C++ qualifier rewriter.
//!
//! This library parses C and C++ translation units, finds `const`, `volatile`
//! and `restrict` qualifiers written west of the type they modify and moves
//! them east, either as diagnostics or as in-place edits.

// Allow common complexity warnings - these are intentional design choices
#![allow(
    clippy::too_many_arguments,
    clippy::similar_names,
    clippy::map_unwrap_or,
    clippy::items_after_statements
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

/// Module defining the command-line interface arguments and structs.
pub mod cli;

/// Module containing the rewrite command run by the CLI.
pub mod commands;

/// Module for loading `.eastconst.toml`.
pub mod config;

/// Module containing shared constants and regex patterns.
pub mod constants;

/// The qualifier relocation engine.
pub mod engine;

/// Module defining the entry point logic shared by the binaries.
pub mod entry_point;

/// Edit collection and application.
pub mod fix;

/// Lexing, preprocessing and parsing of C++ sources.
pub mod frontend;

/// Module for rich CLI output formatting with colored text and progress bars.
pub mod output;

/// Module containing utility functions.
pub mod utils;
