use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Configuration for a [`BuildOrchestrator`](crate::build::BuildOrchestrator).
///
/// All relative paths are resolved against [`project_root`](Self::project_root). The defaults
/// mirror the conventional project layout: sources in `cmd`, artifacts in `build`, compiled with
/// `go build`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BuildConfig {
    pub project_root: PathBuf,
    /// Working directory of the compiler process.
    pub source_dir: PathBuf,
    /// Base directory below which `<os>/<arch>/<binary>` is created.
    pub output_root: PathBuf,
    pub toolchain: Toolchain,
}

impl BuildConfig {
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        BuildConfig {
            project_root: project_root.into(),
            ..BuildConfig::default()
        }
    }

    #[must_use]
    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    #[must_use]
    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// The compiler's working directory, resolved against the project root.
    #[must_use]
    pub fn resolved_source_dir(&self) -> PathBuf {
        resolve(&self.project_root, &self.source_dir)
    }

    /// The output root, resolved against the project root.
    #[must_use]
    pub fn resolved_output_root(&self) -> PathBuf {
        resolve(&self.project_root, &self.output_root)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            project_root: PathBuf::from("."),
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            toolchain: Toolchain::default(),
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Describes how to invoke the external compiler.
///
/// The process is started as `<program> <args...> <output path>` with the two target environment
/// variables set. No shell is involved, so arguments are passed through exactly as given.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Toolchain {
    pub program: OsString,
    /// Arguments preceding the output path.
    pub args: Vec<OsString>,
    pub os_env_var: OsString,
    pub arch_env_var: OsString,
}

impl Toolchain {
    /// The Go toolchain: `GOOS=<os> GOARCH=<arch> go build -o <output path>`.
    #[must_use]
    pub fn go() -> Self {
        Toolchain {
            program: OsString::from("go"),
            args: vec![OsString::from("build"), OsString::from("-o")],
            os_env_var: OsString::from("GOOS"),
            arch_env_var: OsString::from("GOARCH"),
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain::go()
    }
}

pub const DEFAULT_SOURCE_DIR: &str = "cmd";
pub const DEFAULT_OUTPUT_ROOT: &str = "build";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = BuildConfig::default();

        assert_eq!(config.resolved_source_dir(), PathBuf::from("./cmd"));
        assert_eq!(config.resolved_output_root(), PathBuf::from("./build"));
        assert_eq!(config.toolchain, Toolchain::go());
    }

    #[test]
    fn relative_paths_resolve_against_project_root() {
        let config = BuildConfig::new("/project")
            .with_source_dir("src/agent")
            .with_output_root("out");

        assert_eq!(
            config.resolved_source_dir(),
            PathBuf::from("/project/src/agent")
        );
        assert_eq!(config.resolved_output_root(), PathBuf::from("/project/out"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let config = BuildConfig::new("/project").with_output_root("/var/artifacts");

        assert_eq!(
            config.resolved_output_root(),
            PathBuf::from("/var/artifacts")
        );
    }

    #[test]
    fn toolchain_overrides() {
        let toolchain = Toolchain::go()
            .with_program("/usr/local/go/bin/go")
            .with_args(["build", "-trimpath", "-o"]);

        assert_eq!(toolchain.program, OsString::from("/usr/local/go/bin/go"));
        assert_eq!(
            toolchain.args,
            vec![
                OsString::from("build"),
                OsString::from("-trimpath"),
                OsString::from("-o")
            ]
        );
        assert_eq!(toolchain.os_env_var, OsString::from("GOOS"));
    }
}
