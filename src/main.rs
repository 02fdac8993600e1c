//! calidad CLI - dataset quality grading from the command line.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::uninlined_format_args)]

use std::process::ExitCode;

fn main() -> ExitCode {
    calidad::cli::run()
}
