use crate::build::error::Error;
use crate::cli::BuildArgs;
use crossbuild::build::{BuildOrchestrator, BuildOutcome};
use crossbuild::config::{BuildConfig, Toolchain};
use crossbuild::target::{HostPlatformError, TargetDescriptor};
use crossbuild::CancellationToken;
use log::{debug, info};

type Result<T> = std::result::Result<T, Error>;

pub(crate) fn execute(
    args: &BuildArgs,
    cancellation: &CancellationToken,
) -> Result<BuildOutcome> {
    let descriptor = target_descriptor(args)?;
    let orchestrator = BuildOrchestrator::new(build_config(args));

    info!(
        "🏗\u{fe0f} Building {} for {}/{}...",
        descriptor.binary_name(),
        descriptor.os(),
        descriptor.arch()
    );
    debug!(
        "Output path: {}",
        orchestrator.output_path(&descriptor).to_string_lossy()
    );

    // The compiler's stdout goes to stderr as well, stdout is reserved for the resulting path.
    orchestrator
        .build_and_write_streams(
            &descriptor,
            Some(cancellation),
            std::io::stderr(),
            std::io::stderr(),
        )
        .map_err(Error::Build)
}

/// Explicit `--os`/`--arch` values win over the host platform, which wins over the defaults.
fn target_descriptor(args: &BuildArgs) -> Result<TargetDescriptor> {
    let base = if args.host {
        TargetDescriptor::host(args.binary.as_str()).map_err(|error| match error {
            HostPlatformError::InvalidDescriptor(error) => Error::InvalidTarget(error),
            error => Error::HostPlatform(error),
        })?
    } else {
        TargetDescriptor::default()
    };

    TargetDescriptor::new(
        args.os.as_deref().unwrap_or(base.os()),
        args.arch.as_deref().unwrap_or(base.arch()),
        args.binary.as_str(),
    )
    .map_err(Error::InvalidTarget)
}

fn build_config(args: &BuildArgs) -> BuildConfig {
    let mut toolchain = Toolchain::go().with_program(args.compiler.clone());
    if !args.compiler_args.is_empty() {
        toolchain = toolchain.with_args(args.compiler_args.clone());
    }

    BuildConfig::new(args.project_root.clone())
        .with_source_dir(args.source_dir.clone())
        .with_output_root(args.output_root.clone())
        .with_toolchain(toolchain)
}
