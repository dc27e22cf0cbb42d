use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};

use viskit_dist::{
    AndroidArch, BuildConfiguration, BuildOptions, BuildPipeline, CompilationMode, Console,
    DesktopMode, EnvSnapshot, IosArch, OpenCvLinkage, ProjectLayout, SystemRunner,
    UninstallOptions,
};

/// CLI orchestrator for building the ViSKit native plugin and installing it
/// into the host project.
#[derive(Parser, Debug)]
#[command(
    name = "viskit-build",
    version,
    about = "Build and install the ViSKit native plugin",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and install native libraries
    Build(BuildArgs),
    /// Clean cache files
    Clean(CleanArgs),
    /// Remove installed files
    Uninstall(UninstallArgs),
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// Build desktop native libraries in the given flavor
    #[arg(long, value_enum)]
    desktop: Option<DesktopModeArg>,

    /// Build the Android archive for the given architecture
    #[arg(long, value_enum)]
    android: Option<AndroidArchArg>,

    /// Android NDK API level to compile against
    #[arg(long = "android_ndk_api_level", default_value_t = 21)]
    android_ndk_api_level: u32,

    /// Build the iOS framework for the given architecture
    #[arg(long, value_enum)]
    ios: Option<IosArchArg>,

    /// Build and install asset bundles (default on)
    #[arg(long, overrides_with = "no_resources")]
    resources: bool,
    #[arg(long = "no-resources")]
    no_resources: bool,

    /// Install analyzer assemblies (default off)
    #[arg(long, overrides_with = "no_analyzers")]
    analyzers: bool,
    #[arg(long = "no-analyzers")]
    no_analyzers: bool,

    #[arg(
        long = "compilation_mode",
        short = 'c',
        value_enum,
        default_value_t = CompilationModeArg::Opt
    )]
    compilation_mode: CompilationModeArg,

    /// Which OpenCV to link into the desktop native libraries
    #[arg(long, value_enum, default_value_t = OpenCvArg::Local)]
    opencv: OpenCvArg,

    /// Ship OpenCV's own shared libraries alongside the plugin
    #[arg(long = "include_opencv_libs")]
    include_opencv_libs: bool,

    /// Restrict the asset build to the named solutions
    #[arg(long, num_args = 1..)]
    solutions: Vec<String>,

    /// Linker options forwarded to the build tool
    #[arg(long, short = 'l', allow_hyphen_values = true)]
    linkopt: Vec<String>,

    /// Embed bitcode into the iOS framework (default on)
    #[arg(long = "apple_bitcode", overrides_with = "no_apple_bitcode")]
    apple_bitcode: bool,
    #[arg(long = "no-apple_bitcode")]
    no_apple_bitcode: bool,

    /// Build macOS desktop libraries as universal binaries (default off)
    #[arg(long = "macos_universal", overrides_with = "no_macos_universal")]
    macos_universal: bool,
    #[arg(long = "no-macos_universal")]
    no_macos_universal: bool,

    /// Startup options forwarded to the build tool
    #[arg(long = "bazel_startup_opts", allow_hyphen_values = true)]
    bazel_startup_opts: Vec<String>,

    /// Build options appended after every structural flag
    #[arg(long = "bazel_build_opts", allow_hyphen_values = true)]
    bazel_build_opts: Vec<String>,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl BuildArgs {
    fn to_options(&self) -> BuildOptions {
        BuildOptions {
            desktop: self.desktop.map(Into::into),
            android: self.android.map(Into::into),
            android_ndk_api_level: self.android_ndk_api_level,
            ios: self.ios.map(Into::into),
            resources: self.resources || !self.no_resources,
            analyzers: self.analyzers,
            compilation_mode: self.compilation_mode.into(),
            opencv: self.opencv.into(),
            include_opencv_libs: self.include_opencv_libs,
            solutions: self.solutions.clone(),
            linkopts: self.linkopt.clone(),
            apple_bitcode: self.apple_bitcode || !self.no_apple_bitcode,
            macos_universal: self.macos_universal,
            startup_opts: self.bazel_startup_opts.clone(),
            build_opts: self.bazel_build_opts.clone(),
            verbosity: self.verbose,
        }
    }
}

#[derive(clap::Args, Debug)]
struct CleanArgs {
    /// Startup options forwarded to the build tool
    #[arg(long = "bazel_startup_opts", allow_hyphen_values = true)]
    bazel_startup_opts: Vec<String>,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::Args, Debug)]
struct UninstallArgs {
    /// Remove desktop native libraries (default on)
    #[arg(long, overrides_with = "no_desktop")]
    desktop: bool,
    #[arg(long = "no-desktop")]
    no_desktop: bool,

    /// Remove the Android archive (default on)
    #[arg(long, overrides_with = "no_android")]
    android: bool,
    #[arg(long = "no-android")]
    no_android: bool,

    /// Remove the iOS framework (default on)
    #[arg(long, overrides_with = "no_ios")]
    ios: bool,
    #[arg(long = "no-ios")]
    no_ios: bool,

    /// Remove installed asset bundles (default on)
    #[arg(long, overrides_with = "no_resources")]
    resources: bool,
    #[arg(long = "no-resources")]
    no_resources: bool,

    /// Remove protobuf sources and runtime assemblies (default on)
    #[arg(long, overrides_with = "no_protobuf")]
    protobuf: bool,
    #[arg(long = "no-protobuf")]
    no_protobuf: bool,

    /// Remove analyzer assemblies (default on)
    #[arg(long, overrides_with = "no_analyzers")]
    analyzers: bool,
    #[arg(long = "no-analyzers")]
    no_analyzers: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl UninstallArgs {
    fn to_options(&self) -> UninstallOptions {
        UninstallOptions {
            desktop: self.desktop || !self.no_desktop,
            android: self.android || !self.no_android,
            ios: self.ios || !self.no_ios,
            resources: self.resources || !self.no_resources,
            protobuf: self.protobuf || !self.no_protobuf,
            analyzers: self.analyzers || !self.no_analyzers,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum DesktopModeArg {
    Cpu,
    Gpu,
}

impl From<DesktopModeArg> for DesktopMode {
    fn from(arg: DesktopModeArg) -> Self {
        match arg {
            DesktopModeArg::Cpu => DesktopMode::Cpu,
            DesktopModeArg::Gpu => DesktopMode::Gpu,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum AndroidArchArg {
    Armv7,
    Arm64,
    Fat,
}

impl From<AndroidArchArg> for AndroidArch {
    fn from(arg: AndroidArchArg) -> Self {
        match arg {
            AndroidArchArg::Armv7 => AndroidArch::Armv7,
            AndroidArchArg::Arm64 => AndroidArch::Arm64,
            AndroidArchArg::Fat => AndroidArch::Fat,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum IosArchArg {
    Arm64,
}

impl From<IosArchArg> for IosArch {
    fn from(arg: IosArchArg) -> Self {
        match arg {
            IosArchArg::Arm64 => IosArch::Arm64,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum CompilationModeArg {
    Fastbuild,
    Opt,
    Dbg,
}

impl From<CompilationModeArg> for CompilationMode {
    fn from(arg: CompilationModeArg) -> Self {
        match arg {
            CompilationModeArg::Fastbuild => CompilationMode::Fastbuild,
            CompilationModeArg::Opt => CompilationMode::Opt,
            CompilationModeArg::Dbg => CompilationMode::Dbg,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum OpenCvArg {
    Local,
    Cmake,
}

impl From<OpenCvArg> for OpenCvLinkage {
    fn from(arg: OpenCvArg) -> Self {
        match arg {
            OpenCvArg::Local => OpenCvLinkage::Local,
            OpenCvArg::Cmake => OpenCvLinkage::Cmake,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        // Bare invocation prints usage and succeeds.
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    let console = Console::new(verbosity_of(&command));
    match run(command, &console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.error(format!("{err:#}"));
            let code = err
                .downcast_ref::<viskit_dist::Error>()
                .map(viskit_dist::Error::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn verbosity_of(command: &Command) -> u8 {
    match command {
        Command::Build(args) => args.verbose,
        Command::Clean(args) => args.verbose,
        Command::Uninstall(args) => args.verbose,
    }
}

fn run(command: Command, console: &Console) -> Result<()> {
    let root = env::current_dir().context("resolving the project root")?;
    let layout = ProjectLayout::new(&root);
    let runner = SystemRunner::new(&root);

    match command {
        Command::Build(args) => {
            let env = EnvSnapshot::capture();
            let config = BuildConfiguration::resolve(args.to_options(), &env, console)?;
            BuildPipeline::new(config, layout, env, &runner, console).run()?;
        }
        Command::Clean(args) => {
            let env = EnvSnapshot::capture();
            viskit_dist::clean(&layout, &args.bazel_startup_opts, &env, &runner, console)?;
        }
        Command::Uninstall(args) => {
            viskit_dist::uninstall(&layout, &args.to_options(), console)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).unwrap()
    }

    fn build_args(cli: Cli) -> BuildArgs {
        match cli.command {
            Some(Command::Build(args)) => args,
            other => panic!("expected build subcommand, got {other:?}"),
        }
    }

    #[test]
    fn build_defaults_match_the_documented_surface() {
        let options = build_args(parse(&["viskit-build", "build"])).to_options();
        assert!(options.desktop.is_none());
        assert!(options.android.is_none());
        assert!(options.ios.is_none());
        assert_eq!(options.android_ndk_api_level, 21);
        assert!(options.resources);
        assert!(!options.analyzers);
        assert_eq!(options.compilation_mode, CompilationMode::Opt);
        assert_eq!(options.opencv, OpenCvLinkage::Local);
        assert!(!options.include_opencv_libs);
        assert!(options.apple_bitcode);
        assert!(!options.macos_universal);
        assert_eq!(options.verbosity, 0);
    }

    #[test]
    fn negative_flags_flip_the_defaults() {
        let options = build_args(parse(&[
            "viskit-build",
            "build",
            "--no-resources",
            "--no-apple_bitcode",
            "--analyzers",
            "--macos_universal",
        ]))
        .to_options();
        assert!(!options.resources);
        assert!(!options.apple_bitcode);
        assert!(options.analyzers);
        assert!(options.macos_universal);
    }

    #[test]
    fn later_toggle_occurrences_win() {
        let options = build_args(parse(&[
            "viskit-build",
            "build",
            "--no-resources",
            "--resources",
        ]))
        .to_options();
        assert!(options.resources);
    }

    #[test]
    fn axis_values_convert_into_library_enums() {
        let options = build_args(parse(&[
            "viskit-build",
            "build",
            "--desktop",
            "gpu",
            "--android",
            "fat",
            "--android_ndk_api_level",
            "28",
            "--compilation_mode",
            "dbg",
            "--opencv",
            "cmake",
        ]))
        .to_options();
        assert_eq!(options.desktop, Some(DesktopMode::Gpu));
        assert_eq!(options.android, Some(AndroidArch::Fat));
        assert_eq!(options.android_ndk_api_level, 28);
        assert_eq!(options.compilation_mode, CompilationMode::Dbg);
        assert_eq!(options.opencv, OpenCvLinkage::Cmake);
    }

    #[test]
    fn unknown_axis_values_are_rejected() {
        assert!(Cli::try_parse_from(["viskit-build", "build", "--desktop", "tpu"]).is_err());
        assert!(Cli::try_parse_from(["viskit-build", "build", "--android", "x86"]).is_err());
    }

    #[test]
    fn repeatable_options_accumulate() {
        let options = build_args(parse(&[
            "viskit-build",
            "build",
            "--linkopt",
            "-s",
            "-l",
            "-dead_strip",
            "--bazel_build_opts",
            "--jobs=4",
            "--bazel_build_opts",
            "--curses=no",
            "--solutions",
            "face_mesh",
            "iris",
            "-vvv",
        ]))
        .to_options();
        assert_eq!(options.linkopts, vec!["-s", "-dead_strip"]);
        assert_eq!(options.build_opts, vec!["--jobs=4", "--curses=no"]);
        assert_eq!(options.solutions, vec!["face_mesh", "iris"]);
        assert_eq!(options.verbosity, 3);
    }

    #[test]
    fn uninstall_defaults_select_every_category() {
        let cli = parse(&["viskit-build", "uninstall"]);
        let Some(Command::Uninstall(args)) = cli.command else {
            panic!("expected uninstall subcommand");
        };
        let options = args.to_options();
        assert!(options.desktop);
        assert!(options.android);
        assert!(options.ios);
        assert!(options.resources);
        assert!(options.protobuf);
        assert!(options.analyzers);
    }

    #[test]
    fn uninstall_categories_opt_out_individually() {
        let cli = parse(&["viskit-build", "uninstall", "--no-desktop", "--no-protobuf"]);
        let Some(Command::Uninstall(args)) = cli.command else {
            panic!("expected uninstall subcommand");
        };
        let options = args.to_options();
        assert!(!options.desktop);
        assert!(!options.protobuf);
        assert!(options.android);
        assert!(options.ios);
        assert!(options.resources);
        assert!(options.analyzers);
    }

    #[test]
    fn clean_accepts_startup_options() {
        let cli = parse(&[
            "viskit-build",
            "clean",
            "--bazel_startup_opts",
            "--nobatch",
            "-v",
        ]);
        let Some(Command::Clean(args)) = cli.command else {
            panic!("expected clean subcommand");
        };
        assert_eq!(args.bazel_startup_opts, vec!["--nobatch"]);
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn bare_invocation_parses_without_a_subcommand() {
        let cli = parse(&["viskit-build"]);
        assert!(cli.command.is_none());
    }
}
