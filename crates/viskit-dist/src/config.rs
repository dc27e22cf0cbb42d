//! Build-axis validation.
//!
//! Raw CLI selections arrive as [`BuildOptions`]; [`BuildConfiguration::resolve`]
//! checks them against each other, the target registry's host requirements,
//! and the environment snapshot, producing the immutable configuration the
//! rest of the pipeline runs from. All contradictions are caught here, before
//! any subprocess starts.

use crate::console::Console;
use crate::platform::EnvSnapshot;
use crate::registry::{self, TargetKind};
use crate::types::{
    AndroidArch, CompilationMode, DesktopMode, Error, IosArch, OpenCvLinkage, Result,
};

/// Lowest and highest Android NDK API levels the toolchain supports.
pub const NDK_API_LEVEL_RANGE: (u32, u32) = (16, 30);

/// Raw, unvalidated build selections as they come off the CLI.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub desktop: Option<DesktopMode>,
    pub android: Option<AndroidArch>,
    pub android_ndk_api_level: u32,
    pub ios: Option<IosArch>,
    pub resources: bool,
    pub analyzers: bool,
    pub compilation_mode: CompilationMode,
    pub opencv: OpenCvLinkage,
    pub include_opencv_libs: bool,
    /// Restrict the asset build to the named solutions; empty means all.
    pub solutions: Vec<String>,
    pub linkopts: Vec<String>,
    pub apple_bitcode: bool,
    pub macos_universal: bool,
    pub startup_opts: Vec<String>,
    pub build_opts: Vec<String>,
    pub verbosity: u8,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            desktop: None,
            android: None,
            android_ndk_api_level: 21,
            ios: None,
            resources: true,
            analyzers: false,
            compilation_mode: CompilationMode::Opt,
            opencv: OpenCvLinkage::Local,
            include_opencv_libs: false,
            solutions: Vec::new(),
            linkopts: Vec::new(),
            apple_bitcode: true,
            macos_universal: false,
            startup_opts: Vec::new(),
            build_opts: Vec::new(),
            verbosity: 0,
        }
    }
}

/// Validated, immutable snapshot of one invocation's build axes.
///
/// Created once per run and never mutated afterwards; command synthesis and
/// stage sequencing read from it only.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    pub desktop: Option<DesktopMode>,
    pub android: Option<AndroidArch>,
    pub android_ndk_api_level: u32,
    pub ios: Option<IosArch>,
    pub resources: bool,
    pub analyzers: bool,
    pub compilation_mode: CompilationMode,
    pub opencv: OpenCvLinkage,
    pub include_opencv_libs: bool,
    pub solutions: Vec<String>,
    pub linkopts: Vec<String>,
    pub apple_bitcode: bool,
    pub macos_universal: bool,
    pub startup_opts: Vec<String>,
    pub build_opts: Vec<String>,
    pub verbosity: u8,
}

impl BuildConfiguration {
    /// Validates raw selections into a configuration.
    ///
    /// Fatal contradictions return [`Error::Config`]. Redundant-but-harmless
    /// combinations are downgraded: requesting the OpenCV library copy while
    /// linking OpenCV through CMake (which already embeds the objects into
    /// the native library) turns the copy off with a warning instead of
    /// failing the run.
    pub fn resolve(
        options: BuildOptions,
        env: &EnvSnapshot,
        console: &Console,
    ) -> Result<Self> {
        let (min_level, max_level) = NDK_API_LEVEL_RANGE;
        if options.android.is_some()
            && !(min_level..=max_level).contains(&options.android_ndk_api_level)
        {
            return Err(Error::Config(format!(
                "--android_ndk_api_level must be between {} and {}, got {}",
                min_level, max_level, options.android_ndk_api_level
            )));
        }

        if options.ios.is_some() {
            registry::spec(TargetKind::Ios).check_host(env.host())?;
        }

        // Bazel consults PYTHON_BIN_PATH on Windows; catch its absence here
        // rather than minutes into the first build stage.
        if env.host().is_windows() && env.get("PYTHON_BIN_PATH").is_none() {
            return Err(Error::Config(
                "`PYTHON_BIN_PATH` is not set".to_string(),
            ));
        }

        let mut include_opencv_libs = options.include_opencv_libs;
        if include_opencv_libs && options.opencv == OpenCvLinkage::Cmake {
            console.warn(
                "OpenCV objects are embedded in the native library, so skip copying OpenCV library files",
            );
            include_opencv_libs = false;
        }

        Ok(Self {
            desktop: options.desktop,
            android: options.android,
            android_ndk_api_level: options.android_ndk_api_level,
            ios: options.ios,
            resources: options.resources,
            analyzers: options.analyzers,
            compilation_mode: options.compilation_mode,
            opencv: options.opencv,
            include_opencv_libs,
            solutions: options.solutions,
            linkopts: options.linkopts,
            apple_bitcode: options.apple_bitcode,
            macos_universal: options.macos_universal,
            startup_opts: options.startup_opts,
            build_opts: options.build_opts,
            verbosity: options.verbosity,
        })
    }
}
