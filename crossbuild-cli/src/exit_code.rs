pub(crate) const SUCCESS: i32 = 0;
pub(crate) const UNSPECIFIED_ERROR: i32 = 1;
/// Conventional exit code for a process interrupted by SIGINT.
pub(crate) const CANCELLED: i32 = 130;
