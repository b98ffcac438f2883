use crate::command::{CommandCompletion, CommandExt};
use crate::config::BuildConfig;
use crate::output::{create_output_dir_resolver, create_output_path_resolver};
use crate::target::TargetDescriptor;
use log::debug;
use path_absolutize::Absolutize;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{self, Command, ExitStatus};
use tokio_util::sync::CancellationToken;

/// Builds binaries for target platforms into `<output_root>/<os>/<arch>/<binary_name>`.
///
/// The orchestrator holds no mutable state. A single instance can be shared between threads and
/// used for concurrent builds of distinct targets.
#[derive(Debug, Clone)]
pub struct BuildOrchestrator {
    config: BuildConfig,
}

impl BuildOrchestrator {
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        BuildOrchestrator { config }
    }

    /// The directory the binary for `descriptor` is written to, relative to the project root
    /// unless the configured output root is absolute.
    #[must_use]
    pub fn output_dir(&self, descriptor: &TargetDescriptor) -> PathBuf {
        create_output_dir_resolver(&self.config.output_root)(descriptor)
    }

    /// The path of the binary for `descriptor`, relative to the project root unless the
    /// configured output root is absolute.
    #[must_use]
    pub fn output_path(&self, descriptor: &TargetDescriptor) -> PathBuf {
        create_output_path_resolver(&self.config.output_root)(descriptor)
    }

    /// Creates the output directory for `descriptor` including all missing parents.
    ///
    /// Existing directories and their contents are left untouched. Returns the absolute path of
    /// the directory.
    pub fn ensure_output_dir(&self, descriptor: &TargetDescriptor) -> Result<PathBuf, BuildError> {
        let output_root = absolute_path(&self.config.resolved_output_root())?;
        let output_dir = create_output_dir_resolver(&output_root)(descriptor);

        fs::create_dir_all(&output_dir)
            .map_err(|error| BuildError::CreateOutputDirectory(output_dir.clone(), error))?;

        Ok(output_dir)
    }

    /// Builds the binary for `descriptor`.
    ///
    /// The compiler's output is captured but not relayed. See
    /// [`build_and_write_streams`](Self::build_and_write_streams) for details.
    pub fn build(&self, descriptor: &TargetDescriptor) -> Result<BuildOutcome, BuildError> {
        self.build_and_write_streams(descriptor, None, io::sink(), io::sink())
    }

    /// Builds the binary for `descriptor`, writing the compiler's stdout and stderr to the given
    /// writers while it runs.
    ///
    /// The compiler is started as `<program> <args...> <path>` in the source directory with the
    /// toolchain's OS and architecture environment variables set. It writes into a private staging
    /// directory next to the final output path; only a successfully compiled binary is renamed
    /// onto the output path. On failure, the output path is left as it was.
    ///
    /// When `cancellation` is cancelled, the compiler process is killed and
    /// [`BuildOutcome::Cancelled`] is returned.
    pub fn build_and_write_streams<OW: Write + Send, EW: Write + Send>(
        &self,
        descriptor: &TargetDescriptor,
        cancellation: Option<&CancellationToken>,
        stdout_write: OW,
        stderr_write: EW,
    ) -> Result<BuildOutcome, BuildError> {
        let output_dir = self.ensure_output_dir(descriptor)?;
        let absolute_output_path = output_dir.join(descriptor.binary_name());

        let source_dir = absolute_path(&self.config.resolved_source_dir())?;
        if !source_dir.is_dir() {
            return Err(BuildError::MissingSourceDirectory(source_dir));
        }

        let toolchain = &self.config.toolchain;
        let program = which::which(&toolchain.program)
            .map_err(|error| BuildError::CompilerNotFound(toolchain.program.clone(), error))?;

        if cancellation.is_some_and(CancellationToken::is_cancelled) {
            return Ok(BuildOutcome::Cancelled);
        }

        // Removed on drop, together with anything a failed or cancelled compiler left behind.
        let staging_dir = tempfile::Builder::new()
            .prefix(STAGING_DIR_PREFIX)
            .tempdir_in(&output_dir)
            .map_err(|error| BuildError::CreateStagingDirectory(output_dir.clone(), error))?;
        let staged_binary_path = staging_dir.path().join(descriptor.binary_name());

        let mut command = Command::new(&program);
        command
            .args(&toolchain.args)
            .arg(&staged_binary_path)
            .env(&toolchain.os_env_var, descriptor.os())
            .env(&toolchain.arch_env_var, descriptor.arch())
            .current_dir(&source_dir);

        debug!(
            "Running {} {:?} in {} with {}={} {}={}",
            program.display(),
            command.get_args().collect::<Vec<_>>(),
            source_dir.display(),
            toolchain.os_env_var.to_string_lossy(),
            descriptor.os(),
            toolchain.arch_env_var.to_string_lossy(),
            descriptor.arch()
        );

        let completion = match cancellation {
            Some(cancellation) => command.output_and_write_streams_cancellable(
                stdout_write,
                stderr_write,
                cancellation,
            ),
            None => command
                .output_and_write_streams(stdout_write, stderr_write)
                .map(CommandCompletion::Exited),
        }
        .map_err(BuildError::CompilerProcessIoError)?;

        let compiler_output = match completion {
            CommandCompletion::Exited(output) => output,
            CommandCompletion::Cancelled(_) => {
                debug!("Build for {descriptor} was cancelled");
                return Ok(BuildOutcome::Cancelled);
            }
        };

        if !compiler_output.status.success() {
            return Err(BuildError::CompilationFailure {
                status: compiler_output.status,
                stdout: String::from_utf8_lossy(&compiler_output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&compiler_output.stderr).into_owned(),
            });
        }

        let size_in_bytes = match fs::metadata(&staged_binary_path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => return Err(BuildError::MissingArtifact(absolute_output_path)),
        };

        fs::rename(&staged_binary_path, &absolute_output_path)
            .map_err(|error| BuildError::PersistArtifact(absolute_output_path.clone(), error))?;

        Ok(BuildOutcome::Built(BuiltArtifact {
            descriptor: descriptor.clone(),
            output_path: self.output_path(descriptor),
            absolute_output_path,
            size_in_bytes,
            compiler_output,
        }))
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf, BuildError> {
    path.absolutize()
        .map(PathBuf::from)
        .map_err(|error| BuildError::AbsolutizePath(path.to_path_buf(), error))
}

/// The result of a build that did not fail.
#[derive(Debug)]
pub enum BuildOutcome {
    Built(BuiltArtifact),
    /// The build was cancelled and the compiler process killed. No artifact was written.
    Cancelled,
}

#[derive(Debug)]
pub struct BuiltArtifact {
    pub descriptor: TargetDescriptor,
    /// Path of the binary as laid out below the configured output root, e.g.
    /// `build/linux/arm64/agent`.
    pub output_path: PathBuf,
    pub absolute_output_path: PathBuf,
    pub size_in_bytes: u64,
    /// Everything the compiler wrote to stdout and stderr.
    pub compiler_output: process::Output,
}

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("Failed to determine absolute path of {0}: {1}")]
    AbsolutizePath(PathBuf, #[source] io::Error),
    #[error("Failed to create output directory {0}: {1}")]
    CreateOutputDirectory(PathBuf, #[source] io::Error),
    #[error("Source directory {0} does not exist or is not a directory")]
    MissingSourceDirectory(PathBuf),
    #[error("Could not find compiler {0:?}: {1}")]
    CompilerNotFound(OsString, #[source] which::Error),
    #[error("Failed to create staging directory in {0}: {1}")]
    CreateStagingDirectory(PathBuf, #[source] io::Error),
    #[error("Error while running compiler process: {0}")]
    CompilerProcessIoError(#[source] io::Error),
    #[error("Compiler exited unsuccessfully ({status})\n{stdout}{stderr}")]
    CompilationFailure {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    #[error("Compiler exited successfully, but did not produce {0}")]
    MissingArtifact(PathBuf),
    #[error("Failed to move compiled binary to {0}: {1}")]
    PersistArtifact(PathBuf, #[source] io::Error),
}

const STAGING_DIR_PREFIX: &str = ".crossbuild-";
