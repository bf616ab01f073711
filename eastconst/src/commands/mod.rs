//! Commands module - CLI command implementations.

mod rewrite;

pub use rewrite::{
    process_file, run_rewrite, FileError, FileReport, RewriteOptions, RewriteReport,
    RewriteSummary,
};
