//! Build orchestration and artifact deployment for the ViSKit native plugin.
//!
//! `viskit-dist` turns a validated set of build axes (platform targets,
//! architecture, compilation mode, feature toggles) into the exact sequence
//! of Bazel invocations that produce the plugin's native artifacts, then
//! deploys those artifacts into the layered installation tree a host engine
//! project consumes.
//!
//! # Architecture
//!
//! - **config**: validates raw selections into an immutable
//!   [`BuildConfiguration`]
//! - **registry**: static table of buildable targets (label, host
//!   requirement, flag logic)
//! - **command**: pure invocation synthesis from configuration +
//!   environment snapshot
//! - **deploy**: file copy, additive directory merge, archive extraction,
//!   selective removal
//! - **pipeline**: stage sequencing for build, clean, and uninstall
//! - **runner**: the external-process seam ([`ToolRunner`])
//!
//! # Example
//!
//! ```no_run
//! use viskit_dist::{
//!     BuildConfiguration, BuildOptions, BuildPipeline, Console, DesktopMode, EnvSnapshot,
//!     ProjectLayout, SystemRunner,
//! };
//!
//! let console = Console::new(0);
//! let env = EnvSnapshot::capture();
//! let options = BuildOptions {
//!     desktop: Some(DesktopMode::Cpu),
//!     ..BuildOptions::default()
//! };
//! let config = BuildConfiguration::resolve(options, &env, &console)?;
//! let runner = SystemRunner::new(".");
//! BuildPipeline::new(config, ProjectLayout::new("."), env, &runner, &console).run()?;
//! # Ok::<(), viskit_dist::Error>(())
//! ```

pub mod command;
pub mod config;
pub mod console;
pub mod deploy;
pub mod layout;
pub mod pipeline;
pub mod platform;
pub mod registry;
pub mod runner;
pub mod types;

pub use command::Invocation;
pub use config::{BuildConfiguration, BuildOptions};
pub use console::Console;
pub use deploy::Deployer;
pub use layout::ProjectLayout;
pub use pipeline::{BuildPipeline, UninstallOptions, clean, uninstall};
pub use platform::{EnvSnapshot, HostOs};
pub use registry::{TargetKind, TargetSpec};
pub use runner::{SystemRunner, ToolRunner};
pub use types::{
    AndroidArch, CompilationMode, DesktopMode, Error, IosArch, OpenCvLinkage, Result,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
