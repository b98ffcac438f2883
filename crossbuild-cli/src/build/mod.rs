use crate::build::error::Error;
use crate::cli::BuildArgs;
use crate::exit_code;
use crossbuild::build::{BuildError, BuildOutcome};
use crossbuild::CancellationToken;
use log::{error, info, warn};

mod command;
mod error;

/// Runs the build command and returns the process exit code.
///
/// Ctrl-C cancels the build: the compiler is killed and nothing is written to the output path.
pub(crate) fn run_build_command(args: BuildArgs) -> i32 {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!("❌ Failed to start async runtime: {error}");
            return exit_code::UNSPECIFIED_ERROR;
        }
    };

    match runtime.block_on(build_until_interrupted(args)) {
        Ok(BuildOutcome::Built(artifact)) => {
            // Precision will only be lost for sizes bigger than 52 bits (~4 Petabytes), and even
            // then will only result in a less precise figure, so is not an issue.
            #[allow(clippy::cast_precision_loss)]
            let size_in_mib = artifact.size_in_bytes as f64 / (1024.0 * 1024.0);

            info!(
                "✅ Successfully built {} ({size_in_mib:.2} MiB)",
                artifact.output_path.to_string_lossy()
            );

            println!("{}", artifact.absolute_output_path.to_string_lossy());
            exit_code::SUCCESS
        }
        Ok(BuildOutcome::Cancelled) => {
            warn!("Build was cancelled, no binary was written.");
            exit_code::CANCELLED
        }
        Err(error) => on_build_command_error(&error),
    }
}

async fn build_until_interrupted(args: BuildArgs) -> Result<BuildOutcome, Error> {
    let cancellation = CancellationToken::new();

    let mut build = tokio::task::spawn_blocking({
        let cancellation = cancellation.clone();
        move || command::execute(&args, &cancellation)
    });

    let mut interruptible = true;

    loop {
        tokio::select! {
            // Always prefer the Ctrl-C signal to the build returning.
            biased;

            signal = tokio::signal::ctrl_c(), if interruptible => {
                interruptible = false;

                match signal {
                    Ok(()) => {
                        warn!("Received Ctrl-C, stopping the compiler...");
                        cancellation.cancel();
                    }
                    Err(error) => warn!("Unable to listen for Ctrl-C: {error}"),
                }
            }
            result = &mut build => return result.map_err(Error::BuildTask)?,
        }
    }
}

fn on_build_command_error(error: &Error) -> i32 {
    match error {
        // The compiler's diagnostics have already been relayed to stderr while it was running.
        Error::Build(BuildError::CompilationFailure { status, .. }) => {
            error!("❌ Compiler exited unsuccessfully ({status}).");
            error!("Examine the compiler output above for details and potential compilation errors.");
        }
        Error::Build(BuildError::CompilerNotFound(program, _)) => {
            error!("❌ {error}");
            error!(
                "Hint: Verify that {} is installed and on your PATH, or pass --compiler.",
                program.to_string_lossy()
            );
        }
        _ => error!("❌ {error}"),
    }

    error.exit_code()
}
