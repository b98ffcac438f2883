use crate::target::TargetDescriptor;
use std::path::{Path, PathBuf};

/// Create a function that can construct the output directory for a target.
///
/// The directory is `<output_root>/<os>/<arch>`.
pub fn create_output_dir_resolver(output_root: &Path) -> impl Fn(&TargetDescriptor) -> PathBuf {
    let output_root = PathBuf::from(output_root);

    move |descriptor| output_root.join(descriptor.os()).join(descriptor.arch())
}

/// Create a function that can construct the output location for a target's binary.
///
/// The path is `<output_root>/<os>/<arch>/<binary_name>`.
pub fn create_output_path_resolver(output_root: &Path) -> impl Fn(&TargetDescriptor) -> PathBuf {
    let output_dir_resolver = create_output_dir_resolver(output_root);

    move |descriptor| output_dir_resolver(descriptor).join(descriptor.binary_name())
}

#[cfg(test)]
mod tests {
    use crate::output::{create_output_dir_resolver, create_output_path_resolver};
    use crate::target::TargetDescriptor;
    use std::path::PathBuf;

    #[test]
    fn test_default_target_output_path() {
        let output_path_resolver = create_output_path_resolver(&PathBuf::from("build"));

        assert_eq!(
            output_path_resolver(&TargetDescriptor::default()),
            PathBuf::from("build/darwin/amd64/logagent")
        );
    }

    #[test]
    fn test_output_dir_and_path() {
        let descriptor = TargetDescriptor::new("linux", "arm64", "agent").unwrap();
        let output_root = PathBuf::from("/project/build");

        assert_eq!(
            create_output_dir_resolver(&output_root)(&descriptor),
            PathBuf::from("/project/build/linux/arm64")
        );
        assert_eq!(
            create_output_path_resolver(&output_root)(&descriptor),
            PathBuf::from("/project/build/linux/arm64/agent")
        );
    }
}
