//! Target registry.
//!
//! A static table maps each buildable target to its build-graph label, its
//! host-platform requirement, and the target-specific flags it contributes
//! to an invocation. Dispatch is data-driven over [`TargetKind`]; nothing
//! here branches on strings.

use crate::config::BuildConfiguration;
use crate::platform::HostOs;
use crate::types::{DesktopMode, Error, Result};

/// The buildable units known to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Generated protobuf source archive.
    ProtoSrcs,
    /// Model and asset bundle archive.
    Assets,
    /// Desktop shared library archive.
    Desktop,
    /// OpenCV shared libraries, shipped alongside locally linked desktop
    /// builds.
    OpenCvLibs,
    /// Android AAR.
    Android,
    /// iOS framework archive.
    Ios,
}

/// Static descriptor of one buildable target.
pub struct TargetSpec {
    pub kind: TargetKind,
    /// Build-graph label passed to the build tool, exactly one per
    /// invocation.
    pub label: &'static str,
    /// Host OS this target can only be built on, if restricted.
    pub requires_host: Option<HostOs>,
}

/// One entry per target kind; never changes at runtime.
pub static TARGETS: [TargetSpec; 6] = [
    TargetSpec {
        kind: TargetKind::ProtoSrcs,
        label: "//viskit_api:viskit_proto_srcs",
        requires_host: None,
    },
    TargetSpec {
        kind: TargetKind::Assets,
        label: "//viskit_api:viskit_assets",
        requires_host: None,
    },
    TargetSpec {
        kind: TargetKind::Desktop,
        label: "//viskit_api:viskit_desktop",
        requires_host: None,
    },
    TargetSpec {
        kind: TargetKind::OpenCvLibs,
        label: "//viskit_api:opencv_libs",
        requires_host: None,
    },
    TargetSpec {
        kind: TargetKind::Android,
        label: "//viskit_api/java/com/viskit/plugin:viskit_android",
        requires_host: None,
    },
    TargetSpec {
        kind: TargetKind::Ios,
        label: "//viskit_api/objc:ViskitPlugin",
        requires_host: Some(HostOs::MacOs),
    },
];

/// Looks up the registry entry for a target kind.
pub fn spec(kind: TargetKind) -> &'static TargetSpec {
    TARGETS
        .iter()
        .find(|spec| spec.kind == kind)
        .expect("every TargetKind has a registry entry")
}

impl TargetSpec {
    /// Fails when this target cannot be built on the given host.
    pub fn check_host(&self, host: HostOs) -> Result<()> {
        match self.requires_host {
            Some(required) if required != host => Err(Error::Config(format!(
                "{} can only be built on {:?} hosts",
                self.label, required
            ))),
            _ => Ok(()),
        }
    }

    /// Target-specific flags for one invocation.
    pub fn flags(&self, config: &BuildConfiguration, host: HostOs) -> Vec<String> {
        match self.kind {
            TargetKind::ProtoSrcs => Vec::new(),
            TargetKind::Assets => {
                let mut flags = Vec::new();
                if !config.solutions.is_empty() {
                    flags.push("--define".to_string());
                    flags.push(format!("solutions={}", config.solutions.join(",")));
                }
                flags
            }
            TargetKind::Desktop | TargetKind::OpenCvLibs => desktop_flags(config, host),
            TargetKind::Android => {
                let arch = config
                    .android
                    .expect("android flags requested without an android arch");
                vec![
                    format!("--config=android_{}", arch.as_str()),
                    format!(
                        "--action_env=ANDROID_NDK_API_LEVEL={}",
                        config.android_ndk_api_level
                    ),
                ]
            }
            TargetKind::Ios => {
                let arch = config
                    .ios
                    .expect("ios flags requested without an ios arch");
                let mut flags = vec![format!("--config=ios_{}", arch.as_str())];
                if config.apple_bitcode {
                    flags.push("--copt=-fembed-bitcode".to_string());
                    flags.push("--apple_bitcode=embedded".to_string());
                }
                flags
            }
        }
    }
}

/// Flags shared by the desktop library and the OpenCV library archive,
/// which must be configured identically to link.
fn desktop_flags(config: &BuildConfiguration, host: HostOs) -> Vec<String> {
    let mut flags = Vec::new();

    match config.desktop {
        Some(DesktopMode::Gpu) => {
            flags.extend(
                ["--copt", "-DMESA_EGL_NO_X11_HEADERS", "--copt", "-DEGL_NO_X11"]
                    .map(str::to_string),
            );
        }
        _ => {
            flags.push("--define".to_string());
            flags.push("VISKIT_DISABLE_GPU=1".to_string());
        }
    }

    flags.push(format!("--@opencv//:switch={}", config.opencv.as_str()));

    if config.macos_universal && host.is_macos() {
        flags.push("--config=macos_universal".to_string());
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfiguration, BuildOptions};
    use crate::console::Console;
    use crate::platform::EnvSnapshot;
    use crate::types::{AndroidArch, IosArch, OpenCvLinkage};

    fn resolve(options: BuildOptions, host: HostOs) -> BuildConfiguration {
        let env = EnvSnapshot::from_vars(host, [("PYTHON_BIN_PATH", "/usr/bin/python3")]);
        BuildConfiguration::resolve(options, &env, &Console::new(0)).unwrap()
    }

    #[test]
    fn every_kind_resolves_to_one_entry() {
        for kind in [
            TargetKind::ProtoSrcs,
            TargetKind::Assets,
            TargetKind::Desktop,
            TargetKind::OpenCvLibs,
            TargetKind::Android,
            TargetKind::Ios,
        ] {
            assert_eq!(spec(kind).kind, kind);
        }
    }

    #[test]
    fn cpu_desktop_disables_gpu() {
        let config = resolve(
            BuildOptions {
                desktop: Some(DesktopMode::Cpu),
                ..BuildOptions::default()
            },
            HostOs::Linux,
        );
        let flags = spec(TargetKind::Desktop).flags(&config, HostOs::Linux);
        assert!(flags.contains(&"VISKIT_DISABLE_GPU=1".to_string()));
        assert!(!flags.iter().any(|f| f.contains("EGL")));
    }

    #[test]
    fn gpu_desktop_uses_egl_defines() {
        let config = resolve(
            BuildOptions {
                desktop: Some(DesktopMode::Gpu),
                ..BuildOptions::default()
            },
            HostOs::Linux,
        );
        let flags = spec(TargetKind::Desktop).flags(&config, HostOs::Linux);
        assert!(flags.contains(&"-DEGL_NO_X11".to_string()));
        assert!(!flags.iter().any(|f| f.contains("VISKIT_DISABLE_GPU")));
    }

    #[test]
    fn opencv_libs_match_desktop_configuration() {
        let config = resolve(
            BuildOptions {
                desktop: Some(DesktopMode::Cpu),
                opencv: OpenCvLinkage::Local,
                include_opencv_libs: true,
                ..BuildOptions::default()
            },
            HostOs::Linux,
        );
        assert_eq!(
            spec(TargetKind::OpenCvLibs).flags(&config, HostOs::Linux),
            spec(TargetKind::Desktop).flags(&config, HostOs::Linux)
        );
    }

    #[test]
    fn macos_universal_only_applies_on_macos() {
        let options = BuildOptions {
            desktop: Some(DesktopMode::Cpu),
            macos_universal: true,
            ..BuildOptions::default()
        };
        let on_mac = resolve(options.clone(), HostOs::MacOs);
        assert!(
            spec(TargetKind::Desktop)
                .flags(&on_mac, HostOs::MacOs)
                .contains(&"--config=macos_universal".to_string())
        );

        let on_linux = resolve(options, HostOs::Linux);
        assert!(
            !spec(TargetKind::Desktop)
                .flags(&on_linux, HostOs::Linux)
                .contains(&"--config=macos_universal".to_string())
        );
    }

    #[test]
    fn android_flags_carry_config_and_ndk_level() {
        let config = resolve(
            BuildOptions {
                android: Some(AndroidArch::Fat),
                android_ndk_api_level: 26,
                ..BuildOptions::default()
            },
            HostOs::Linux,
        );
        let flags = spec(TargetKind::Android).flags(&config, HostOs::Linux);
        assert_eq!(
            flags,
            vec![
                "--config=android_fat".to_string(),
                "--action_env=ANDROID_NDK_API_LEVEL=26".to_string(),
            ]
        );
    }

    #[test]
    fn bitcode_toggle_controls_ios_flags() {
        let embedded = resolve(
            BuildOptions {
                ios: Some(IosArch::Arm64),
                ..BuildOptions::default()
            },
            HostOs::MacOs,
        );
        let flags = spec(TargetKind::Ios).flags(&embedded, HostOs::MacOs);
        assert!(flags.contains(&"--apple_bitcode=embedded".to_string()));

        let plain = resolve(
            BuildOptions {
                ios: Some(IosArch::Arm64),
                apple_bitcode: false,
                ..BuildOptions::default()
            },
            HostOs::MacOs,
        );
        let flags = spec(TargetKind::Ios).flags(&plain, HostOs::MacOs);
        assert_eq!(flags, vec!["--config=ios_arm64".to_string()]);
    }

    #[test]
    fn solutions_narrow_the_asset_build() {
        let config = resolve(
            BuildOptions {
                solutions: vec!["face_mesh".into(), "iris".into()],
                ..BuildOptions::default()
            },
            HostOs::Linux,
        );
        let flags = spec(TargetKind::Assets).flags(&config, HostOs::Linux);
        assert_eq!(
            flags,
            vec!["--define".to_string(), "solutions=face_mesh,iris".to_string()]
        );

        let all = resolve(BuildOptions::default(), HostOs::Linux);
        assert!(spec(TargetKind::Assets).flags(&all, HostOs::Linux).is_empty());
    }

    #[test]
    fn ios_host_requirement_is_enforced() {
        assert!(spec(TargetKind::Ios).check_host(HostOs::MacOs).is_ok());
        assert!(spec(TargetKind::Ios).check_host(HostOs::Linux).is_err());
        assert!(spec(TargetKind::Desktop).check_host(HostOs::Windows).is_ok());
    }
}
