use clap::{ArgAction, Parser, Subcommand};
use crossbuild::config::{DEFAULT_OUTPUT_ROOT, DEFAULT_SOURCE_DIR};
use crossbuild::target::DEFAULT_BINARY_NAME;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crossbuild", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Increase log output, can be repeated
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: CrossbuildSubcommand,
}

#[derive(Subcommand)]
pub(crate) enum CrossbuildSubcommand {
    /// Compiles the binary for a target operating system and architecture
    Build(BuildArgs),
}

#[derive(Parser)]
pub(crate) struct BuildArgs {
    /// Target operating system [default: darwin]
    #[arg(long)]
    pub os: Option<String>,
    /// Target architecture [default: amd64]
    #[arg(long)]
    pub arch: Option<String>,
    /// Name of the compiled binary
    #[arg(long, default_value = DEFAULT_BINARY_NAME)]
    pub binary: String,
    /// Use the host's operating system and architecture unless --os or --arch are given
    #[arg(long)]
    pub host: bool,
    /// Directory that the source and output directories are relative to
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,
    /// Working directory of the compiler
    #[arg(long, default_value = DEFAULT_SOURCE_DIR)]
    pub source_dir: PathBuf,
    /// Directory below which <os>/<arch>/<binary> is written
    #[arg(long, default_value = DEFAULT_OUTPUT_ROOT)]
    pub output_root: PathBuf,
    /// Compiler executable
    #[arg(long, default_value = "go")]
    pub compiler: OsString,
    /// Compiler argument preceding the output path, replaces the default `build -o`
    #[arg(long = "compiler-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub compiler_args: Vec<OsString>,
}
