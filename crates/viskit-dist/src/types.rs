//! Core types for viskit-dist.
//!
//! This module defines the error taxonomy and the build-axis enums shared by
//! the configuration, registry, and command-synthesis layers:
//!
//! - [`Error`] - Failure categories for configuration, tool, and filesystem errors
//! - [`DesktopMode`] / [`AndroidArch`] / [`IosArch`] - Platform axis selections
//! - [`CompilationMode`] - Bazel compilation mode
//! - [`OpenCvLinkage`] - How the desktop library links OpenCV

use std::io;
use std::path::PathBuf;

/// Error type for build orchestration and deployment operations.
///
/// Three families, mirroring the points where a run can fail:
/// configuration problems detected before any subprocess launches,
/// external tool failures, and filesystem/deploy failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or contradictory build-axis selections, or a required
    /// environment variable missing on a platform that needs it.
    ///
    /// Always raised before any subprocess starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// An external tool exited with a non-zero status.
    ///
    /// The exit code is propagated verbatim to the caller.
    #[error("`{tool}` exited with code {code}")]
    Tool { tool: String, code: i32 },

    /// An external tool could not be launched at all.
    #[error("failed to launch `{tool}`: {source}")]
    Spawn { tool: String, source: io::Error },

    /// A deploy operation failed on a specific path.
    #[error("filesystem error at {}: {source}", path.display())]
    FileSystem { path: PathBuf, source: io::Error },

    /// A build output archive could not be read.
    #[error("invalid archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    /// An expected build output does not exist. The hint names the action
    /// that produces it.
    #[error("{} has not been built yet; {hint}", path.display())]
    MissingArtifact { path: PathBuf, hint: String },
}

impl Error {
    /// Process exit code for this error.
    ///
    /// Configuration errors use a distinct code so callers can tell them
    /// apart from propagated tool failures; tool failures reuse the child's
    /// exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Tool { code, .. } => *code,
            _ => 1,
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Desktop build flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopMode {
    /// CPU-only inference; GPU support compiled out.
    Cpu,
    /// GPU inference via EGL.
    Gpu,
}

/// Android target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndroidArch {
    Armv7,
    Arm64,
    /// Multi-arch archive containing both 32- and 64-bit libraries.
    Fat,
}

/// iOS target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IosArch {
    Arm64,
}

/// Bazel compilation mode (`-c`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationMode {
    Fastbuild,
    Opt,
    Dbg,
}

/// How the desktop native library links OpenCV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenCvLinkage {
    /// Link against a locally installed OpenCV; its shared libraries must be
    /// shipped alongside the plugin.
    Local,
    /// Build OpenCV from source via CMake and embed the objects into the
    /// native library.
    Cmake,
}

impl DesktopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesktopMode::Cpu => "cpu",
            DesktopMode::Gpu => "gpu",
        }
    }
}

impl AndroidArch {
    pub fn as_str(&self) -> &'static str {
        match self {
            AndroidArch::Armv7 => "armv7",
            AndroidArch::Arm64 => "arm64",
            AndroidArch::Fat => "fat",
        }
    }
}

impl IosArch {
    pub fn as_str(&self) -> &'static str {
        match self {
            IosArch::Arm64 => "arm64",
        }
    }
}

impl CompilationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilationMode::Fastbuild => "fastbuild",
            CompilationMode::Opt => "opt",
            CompilationMode::Dbg => "dbg",
        }
    }
}

impl OpenCvLinkage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenCvLinkage::Local => "local",
            OpenCvLinkage::Cmake => "cmake",
        }
    }
}
