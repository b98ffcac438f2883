use crate::exit_code;
use crossbuild::build::BuildError;
use crossbuild::target::{HostPlatformError, TargetDescriptorError};

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("Invalid target: {0}")]
    InvalidTarget(#[source] TargetDescriptorError),
    #[error("Failed to determine host platform: {0}")]
    HostPlatform(#[source] HostPlatformError),
    #[error("Build failed: {0}")]
    Build(#[source] BuildError),
    #[error("Build task did not complete: {0}")]
    BuildTask(#[source] tokio::task::JoinError),
}

impl Error {
    /// The compiler's own exit code for failed compilations, a generic error code otherwise.
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Error::Build(BuildError::CompilationFailure { status, .. }) => status
                .code()
                .filter(|code| *code != exit_code::SUCCESS)
                .unwrap_or(exit_code::UNSPECIFIED_ERROR),
            _ => exit_code::UNSPECIFIED_ERROR,
        }
    }
}
