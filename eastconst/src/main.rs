//! Main binary entry point for the `eastconst` rewriter.
//!
//! This binary simply delegates to the shared `entry_point::run_with_args()` function
//! so that it behaves exactly like `eastconst-cli`.

use anyhow::Result;

fn main() -> Result<()> {
    let code = eastconst::entry_point::run_with_args(std::env::args().skip(1).collect())?;
    std::process::exit(code);
}
