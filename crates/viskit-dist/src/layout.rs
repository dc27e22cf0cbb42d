//! Filesystem layout of a plugin project.
//!
//! Every path the pipeline touches is derived from one project root, so the
//! whole tree can be relocated (tests run against a tempdir).

use std::path::{Path, PathBuf};

/// Root-anchored path schema for build outputs, the staging area, the
/// dependency cache, and the installation tree.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bazel's convenience symlink to built outputs.
    pub fn bazel_bin(&self) -> PathBuf {
        self.root.join("bazel-bin")
    }

    /// Bazel's per-configuration output tree.
    pub fn bazel_out(&self) -> PathBuf {
        self.root.join("bazel-out")
    }

    /// Built outputs of the plugin's API package.
    pub fn api_outputs(&self) -> PathBuf {
        self.bazel_bin().join("viskit_api")
    }

    /// Intermediate staging area populated by build stages before
    /// installation.
    pub fn staging(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Local cache populated by the dependency fetcher.
    pub fn nuget_cache(&self) -> PathBuf {
        self.root.join(".nuget")
    }

    /// Root of the installed runtime package inside the host project.
    pub fn install_root(&self) -> PathBuf {
        self.root
            .join("Packages")
            .join("com.viskit.plugin")
            .join("Runtime")
    }

    /// Host-project directory that receives asset bundles directly.
    pub fn streaming_assets(&self) -> PathBuf {
        self.root.join("Assets").join("StreamingAssets")
    }

    /// Host-project directory that receives analyzer assemblies.
    pub fn analyzers(&self) -> PathBuf {
        self.root.join("Assets").join("Analyzers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted() {
        let layout = ProjectLayout::new("/work/plugin");
        assert_eq!(layout.staging(), PathBuf::from("/work/plugin/build"));
        assert_eq!(layout.nuget_cache(), PathBuf::from("/work/plugin/.nuget"));
        assert_eq!(
            layout.install_root(),
            PathBuf::from("/work/plugin/Packages/com.viskit.plugin/Runtime")
        );
        assert_eq!(
            layout.api_outputs(),
            PathBuf::from("/work/plugin/bazel-bin/viskit_api")
        );
    }
}
