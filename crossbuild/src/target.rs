use std::env::consts;
use std::fmt::Display;
use std::path::{Component, Path};

/// Identifies a single build request: the operating system and architecture to compile for and
/// the name of the resulting binary.
///
/// Values are validated on construction and cannot be changed afterwards. Operating system and
/// architecture use the naming of the Go toolchain (`darwin`, `linux`, `amd64`, `arm64`, ...).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TargetDescriptor {
    os: String,
    arch: String,
    binary_name: String,
}

impl TargetDescriptor {
    /// Creates a new descriptor.
    ///
    /// Every field must be non-empty and a single plain path segment, since each one becomes a
    /// component of the output path.
    pub fn new(
        os: impl Into<String>,
        arch: impl Into<String>,
        binary_name: impl Into<String>,
    ) -> Result<Self, TargetDescriptorError> {
        let os = os.into();
        let arch = arch.into();
        let binary_name = binary_name.into();

        validate_field(TargetField::Os, &os)?;
        validate_field(TargetField::Arch, &arch)?;
        validate_field(TargetField::BinaryName, &binary_name)?;

        Ok(TargetDescriptor {
            os,
            arch,
            binary_name,
        })
    }

    /// Creates a descriptor for the platform this process is running on.
    pub fn host(binary_name: impl Into<String>) -> Result<Self, HostPlatformError> {
        let os = host_os()?;
        let arch = host_arch()?;

        TargetDescriptor::new(os, arch, binary_name).map_err(HostPlatformError::InvalidDescriptor)
    }

    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    #[must_use]
    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }
}

impl Default for TargetDescriptor {
    fn default() -> Self {
        TargetDescriptor {
            os: String::from(DEFAULT_OS),
            arch: String::from(DEFAULT_ARCH),
            binary_name: String::from(DEFAULT_BINARY_NAME),
        }
    }
}

impl Display for TargetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({})", self.os, self.arch, self.binary_name)
    }
}

fn validate_field(field: TargetField, value: &str) -> Result<(), TargetDescriptorError> {
    if value.is_empty() {
        return Err(TargetDescriptorError::Empty(field));
    }

    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None)
            if component == value && !value.contains(['/', '\\']) =>
        {
            Ok(())
        }
        _ => Err(TargetDescriptorError::NotAPathSegment(
            field,
            String::from(value),
        )),
    }
}

/// Maps `std::env::consts::OS` to the operating system name used by the Go toolchain.
fn host_os() -> Result<&'static str, HostPlatformError> {
    match consts::OS {
        "macos" => Ok("darwin"),
        os @ ("linux" | "windows" | "freebsd" | "netbsd" | "openbsd" | "android" | "ios"
        | "illumos" | "solaris" | "dragonfly") => Ok(os),
        other => Err(HostPlatformError::UnsupportedOs(other)),
    }
}

/// Maps `std::env::consts::ARCH` to the architecture name used by the Go toolchain.
fn host_arch() -> Result<&'static str, HostPlatformError> {
    match consts::ARCH {
        "x86_64" => Ok("amd64"),
        "aarch64" => Ok("arm64"),
        "x86" => Ok("386"),
        "arm" => Ok("arm"),
        "powerpc64" if cfg!(target_endian = "little") => Ok("ppc64le"),
        "powerpc64" => Ok("ppc64"),
        "riscv64" => Ok("riscv64"),
        "s390x" => Ok("s390x"),
        "loongarch64" => Ok("loong64"),
        other => Err(HostPlatformError::UnsupportedArch(other)),
    }
}

pub const DEFAULT_OS: &str = "darwin";
pub const DEFAULT_ARCH: &str = "amd64";
pub const DEFAULT_BINARY_NAME: &str = "logagent";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TargetField {
    Os,
    Arch,
    BinaryName,
}

impl Display for TargetField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TargetField::Os => "operating system",
            TargetField::Arch => "architecture",
            TargetField::BinaryName => "binary name",
        })
    }
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum TargetDescriptorError {
    #[error("Target {0} must not be empty")]
    Empty(TargetField),
    #[error("Target {0} must be a single path segment, got: {1:?}")]
    NotAPathSegment(TargetField, String),
}

#[derive(thiserror::Error, Debug)]
pub enum HostPlatformError {
    #[error("Host operating system {0} has no known toolchain name")]
    UnsupportedOs(&'static str),
    #[error("Host architecture {0} has no known toolchain name")]
    UnsupportedArch(&'static str),
    #[error("Host platform does not form a valid target: {0}")]
    InvalidDescriptor(#[source] TargetDescriptorError),
}
