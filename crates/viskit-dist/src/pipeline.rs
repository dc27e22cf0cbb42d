//! Stage sequencing.
//!
//! The build pipeline runs a fixed sequence of stages, skipping the ones the
//! configuration disables and aborting on the first failure:
//!
//! ```text
//! ProtoGen -> DependencyFetch -> [Assets] -> [Desktop [-> OpenCvLibs]]
//!          -> [Android] -> [iOS] -> Install -> [Analyzers]
//! ```
//!
//! Each build stage deploys its output into the staging area; the install
//! step then merges staging into the installation tree, so a failed build
//! never touches a previously working install. Clean and uninstall flows
//! live here too.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::command::{self, Invocation};
use crate::config::BuildConfiguration;
use crate::console::Console;
use crate::deploy::Deployer;
use crate::layout::ProjectLayout;
use crate::platform::EnvSnapshot;
use crate::registry::{self, TargetKind};
use crate::runner::ToolRunner;
use crate::types::{Error, Result};

/// File name of the Android archive, both as built and as installed.
const ANDROID_ARCHIVE: &str = "viskit_android.aar";
/// Framework directory the iOS archive unpacks to.
const IOS_FRAMEWORK: &str = "ViskitPlugin.framework";

/// Drives one `build` run from a validated configuration.
pub struct BuildPipeline<'a> {
    config: BuildConfiguration,
    layout: ProjectLayout,
    env: EnvSnapshot,
    runner: &'a dyn ToolRunner,
    console: &'a Console,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(
        config: BuildConfiguration,
        layout: ProjectLayout,
        env: EnvSnapshot,
        runner: &'a dyn ToolRunner,
        console: &'a Console,
    ) -> Self {
        Self {
            config,
            layout,
            env,
            runner,
            console,
        }
    }

    /// Runs every selected stage in order, then installs.
    pub fn run(&self) -> Result<()> {
        let deployer = Deployer::new(self.console);

        self.stage_proto_srcs(&deployer)?;
        self.fetch_dependencies(&deployer)?;

        if self.config.resources {
            self.stage_assets(&deployer)?;
        }
        if self.config.desktop.is_some() {
            self.stage_desktop(&deployer)?;
        }
        if self.config.android.is_some() {
            self.stage_android(&deployer)?;
        }
        if self.config.ios.is_some() {
            self.stage_ios(&deployer)?;
        }

        self.install(&deployer)?;

        if self.config.analyzers {
            self.install_analyzers(&deployer)?;
        }

        self.console.info("Installed");
        Ok(())
    }

    fn run_tool(&self, invocation: &Invocation) -> Result<()> {
        self.console.debug(format!("Running `{}`", invocation));
        self.runner.run(invocation)
    }

    fn build_target(&self, kind: TargetKind) -> Result<()> {
        let invocation = command::bazel_build(&self.config, registry::spec(kind), &self.env);
        self.run_tool(&invocation)
    }

    /// Checks that a declared build output actually exists before deploying
    /// it.
    fn require_output(&self, path: PathBuf, kind: TargetKind) -> Result<PathBuf> {
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::MissingArtifact {
                path,
                hint: format!("produced by `{}`", registry::spec(kind).label),
            })
        }
    }

    fn stage_proto_srcs(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Building protobuf sources...");
        self.build_target(TargetKind::ProtoSrcs)?;
        let archive = self.require_output(
            self.layout.api_outputs().join("viskit_proto_srcs.zip"),
            TargetKind::ProtoSrcs,
        )?;
        deployer.extract_archive(
            &archive,
            &self.layout.staging().join("Scripts").join("Protobuf"),
        )?;
        self.console.info("Built protobuf sources");
        Ok(())
    }

    fn fetch_dependencies(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Restoring managed dependencies...");
        self.run_tool(&command::nuget_restore(".nuget"))?;

        let dest = self.layout.staging().join("Plugins").join("Protobuf");
        for dll in scan_cache(&self.layout.nuget_cache(), "lib/netstandard2.0")? {
            let name = dll.file_name().expect("scanned entries are files");
            deployer.copy_file(&dll, &dest.join(name), 0o755)?;
        }
        self.console.info("Restored managed dependencies");
        Ok(())
    }

    fn stage_assets(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Building asset bundles...");
        self.build_target(TargetKind::Assets)?;
        let archive = self.require_output(
            self.layout.api_outputs().join("viskit_assets.zip"),
            TargetKind::Assets,
        )?;
        // Asset bundles are consumed from both the runtime package and the
        // host project's streaming-assets directory.
        deployer.extract_archive(&archive, &self.layout.staging().join("Resources"))?;
        deployer.extract_archive(&archive, &self.layout.streaming_assets())?;
        self.console.info("Built asset bundles");
        Ok(())
    }

    fn stage_desktop(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Building native libraries for Desktop...");
        self.build_target(TargetKind::Desktop)?;
        let archive = self.require_output(
            self.layout.api_outputs().join("viskit_desktop.zip"),
            TargetKind::Desktop,
        )?;
        deployer.extract_archive(&archive, &self.layout.staging().join("Plugins"))?;

        if self.config.include_opencv_libs {
            self.build_target(TargetKind::OpenCvLibs)?;
            let archive = self.require_output(
                self.layout.api_outputs().join("opencv_libs.zip"),
                TargetKind::OpenCvLibs,
            )?;
            deployer.extract_archive(
                &archive,
                &self.layout.staging().join("Plugins").join("OpenCV"),
            )?;
        }

        self.console.info("Built native libraries for Desktop");
        Ok(())
    }

    fn stage_android(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Building native libraries for Android...");
        self.build_target(TargetKind::Android)?;
        let archive = self.require_output(
            self.layout
                .bazel_bin()
                .join("viskit_api")
                .join("java")
                .join("com")
                .join("viskit")
                .join("plugin")
                .join(ANDROID_ARCHIVE),
            TargetKind::Android,
        )?;
        deployer.copy_file(
            &archive,
            &self
                .layout
                .staging()
                .join("Plugins")
                .join("Android")
                .join(ANDROID_ARCHIVE),
            0o755,
        )?;
        self.console.info("Built native libraries for Android");
        Ok(())
    }

    fn stage_ios(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Building native libraries for iOS...");
        self.build_target(TargetKind::Ios)?;
        let archive = self.find_framework_archive()?;
        deployer.extract_archive(
            &archive,
            &self.layout.staging().join("Plugins").join("iOS"),
        )?;
        self.console.info("Built native libraries for iOS");
        Ok(())
    }

    /// Locates the built framework archive in the per-configuration output
    /// tree.
    ///
    /// Several configurations can leave candidates behind; the newest by
    /// modification time wins, with a warning, since the output path does
    /// not yet encode the configuration that produced it.
    fn find_framework_archive(&self) -> Result<PathBuf> {
        let out_root = self.layout.bazel_out();
        let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

        if let Ok(entries) = fs::read_dir(&out_root) {
            for entry in entries.flatten() {
                let candidate = entry
                    .path()
                    .join("bin")
                    .join("viskit_api")
                    .join("objc")
                    .join("ViskitPlugin.zip");
                if let Ok(meta) = candidate.metadata() {
                    let modified = meta.modified().map_err(|e| Error::fs(&candidate, e))?;
                    candidates.push((modified, candidate));
                }
            }
        }

        if candidates.is_empty() {
            return Err(Error::MissingArtifact {
                path: out_root.join("*/bin/viskit_api/objc/ViskitPlugin.zip"),
                hint: format!("produced by `{}`", registry::spec(TargetKind::Ios).label),
            });
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let (_, newest) = candidates.swap_remove(0);
        if !candidates.is_empty() {
            self.console.warn(format!(
                "{} framework archives found; using the newest, '{}'",
                candidates.len() + 1,
                newest.display()
            ));
        }
        Ok(newest)
    }

    fn install(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Installing built artifacts...");
        deployer.merge_directory(&self.layout.staging(), &self.layout.install_root())
    }

    fn install_analyzers(&self, deployer: &Deployer) -> Result<()> {
        self.console.info("Installing analyzers...");
        let dest = self.layout.analyzers();
        for dll in scan_cache(&self.layout.nuget_cache(), "analyzers/dotnet/cs")? {
            let name = dll.file_name().expect("scanned entries are files");
            deployer.copy_file(&dll, &dest.join(name), 0o755)?;
        }
        Ok(())
    }
}

/// Finds every `.dll` in the dependency cache whose directory ends with the
/// given component suffix, in stable order.
fn scan_cache(cache: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !cache.is_dir() {
        return Ok(Vec::new());
    }
    let suffix = Path::new(suffix);
    let mut found = Vec::new();
    for entry in WalkDir::new(cache) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(cache).to_path_buf();
            Error::fs(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("dll")
            && path.parent().is_some_and(|dir| dir.ends_with(suffix))
        {
            found.push(path.to_path_buf());
        }
    }
    found.sort();
    Ok(found)
}

/// Removes the staging area and dependency cache, then expunges the build
/// tool's own caches.
pub fn clean(
    layout: &ProjectLayout,
    startup_opts: &[String],
    env: &EnvSnapshot,
    runner: &dyn ToolRunner,
    console: &Console,
) -> Result<()> {
    let deployer = Deployer::new(console);
    deployer.remove_tree(&layout.staging())?;
    deployer.remove_tree(&layout.nuget_cache())?;

    let invocation = command::bazel_clean(startup_opts, env);
    console.debug(format!("Running `{}`", invocation));
    runner.run(&invocation)
}

/// Category selection for `uninstall`. Every category defaults to on.
#[derive(Debug, Clone)]
pub struct UninstallOptions {
    pub desktop: bool,
    pub android: bool,
    pub ios: bool,
    pub resources: bool,
    pub protobuf: bool,
    pub analyzers: bool,
}

impl Default for UninstallOptions {
    fn default() -> Self {
        Self {
            desktop: true,
            android: true,
            ios: true,
            resources: true,
            protobuf: true,
            analyzers: true,
        }
    }
}

/// Removes installed artifacts category by category, leaving everything the
/// tool does not own untouched. The installation tree lives inside a host
/// project, so removal is always by explicit pattern, never wholesale.
pub fn uninstall(
    layout: &ProjectLayout,
    options: &UninstallOptions,
    console: &Console,
) -> Result<()> {
    let deployer = Deployer::new(console);
    let install = layout.install_root();

    deployer.remove_tree(&layout.staging())?;

    if options.desktop {
        console.info("Uninstalling native libraries for Desktop...");
        deployer.remove_matching(&install.join("Plugins"), false, is_native_library)?;
    }

    if options.android {
        console.info("Uninstalling native libraries for Android...");
        let aar = install.join("Plugins").join("Android").join(ANDROID_ARCHIVE);
        if aar.exists() {
            deployer.remove_file(&aar)?;
        }
    }

    if options.ios {
        console.info("Uninstalling native libraries for iOS...");
        deployer.remove_tree(&install.join("Plugins").join("iOS").join(IOS_FRAMEWORK))?;
    }

    if options.resources {
        console.info("Uninstalling asset bundles...");
        deployer.remove_matching(&install.join("Resources"), false, |path| !is_meta(path))?;
        deployer.remove_matching(&layout.streaming_assets(), false, |_| true)?;
    }

    if options.protobuf {
        console.info("Uninstalling protobuf sources and runtime...");
        deployer.remove_matching(&install.join("Plugins").join("Protobuf"), false, |path| {
            has_extension(path, "dll")
        })?;
        deployer.remove_matching(&install.join("Scripts").join("Protobuf"), false, |path| {
            !is_meta(path)
        })?;
    }

    if options.analyzers {
        console.info("Uninstalling analyzers...");
        deployer.remove_matching(&layout.analyzers(), false, |path| has_extension(path, "dll"))?;
    }

    Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Host-project importer metadata; never removed by category predicates.
fn is_meta(path: &Path) -> bool {
    has_extension(path, "meta")
}

fn is_native_library(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("dll" | "dylib" | "so")
    )
}
