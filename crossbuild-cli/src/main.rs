#![doc = include_str!("../README.md")]

mod build;
mod cli;
mod exit_code;
mod logging;

use crate::cli::{Cli, CrossbuildSubcommand};
use clap::Parser;

// Suppress warnings due to the `unused_crate_dependencies` lint not handling integration tests well.
#[cfg(test)]
use assert_cmd as _;
#[cfg(all(test, unix))]
use nix as _;
#[cfg(test)]
use tempfile as _;

fn main() {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet);

    let exit_code = match cli.command {
        CrossbuildSubcommand::Build(args) => build::run_build_command(args),
    };

    std::process::exit(exit_code);
}
