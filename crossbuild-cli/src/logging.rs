use crate::exit_code;

/// Logs to stderr at info level, raised by `verbose` or lowered to errors only by `quiet`.
pub(crate) fn setup_logging(verbose: u8, quiet: bool) {
    // 0 is LevelFilter::Error, 2 is LevelFilter::Info
    let verbosity = if quiet { 0 } else { 2 + usize::from(verbose) };

    if let Err(error) = stderrlog::new().verbosity(verbosity).init() {
        eprintln!("Unable to initialize logger: {error}");
        std::process::exit(exit_code::UNSPECIFIED_ERROR);
    }
}
