//! Host platform detection and environment snapshotting.
//!
//! Command synthesis never reads the live process environment. Instead an
//! [`EnvSnapshot`] is captured once per run, holding the host OS and the
//! values of a fixed allow-list of action-environment variables. Anything
//! outside the allow-list is invisible to the rest of the system, which keeps
//! constructed invocations close to hermetic and makes command synthesis a
//! pure function.

use std::collections::BTreeMap;
use std::env;

/// Environment variables that may be forwarded to the build tool via
/// `--action_env`. `PYTHON_BIN_PATH` configures the toolchain's Python
/// interpreter; the rest let CMake detect Visual Studio and the host
/// processor when configuring OpenCV on Windows.
pub const ACTION_ENV_ALLOWLIST: [&str; 6] = [
    "PYTHON_BIN_PATH",
    "ProgramData",
    "PROCESSOR_ARCHITECTURE",
    "PROCESSOR_IDENTIFIER",
    "PROCESSOR_LEVEL",
    "PROCESSOR_REVISION",
];

/// Operating system of the machine running the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl HostOs {
    /// Detects the host from the compile-time target OS.
    pub fn detect() -> Self {
        match env::consts::OS {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            _ => HostOs::Other,
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostOs::Windows)
    }

    pub fn is_macos(&self) -> bool {
        matches!(self, HostOs::MacOs)
    }
}

/// Immutable snapshot of the build-relevant environment.
///
/// Captured once per process; identical snapshots yield identical
/// constructed invocations.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    host: HostOs,
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the allow-listed variables from the current process
    /// environment.
    pub fn capture() -> Self {
        Self::capture_for(HostOs::detect())
    }

    /// Captures the allow-listed variables, overriding the detected host.
    pub fn capture_for(host: HostOs) -> Self {
        let vars = ACTION_ENV_ALLOWLIST
            .iter()
            .filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self { host, vars }
    }

    /// Builds a snapshot from explicit values. Variables outside the
    /// allow-list are discarded.
    pub fn from_vars<I, K, V>(host: HostOs, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(key, _)| ACTION_ENV_ALLOWLIST.contains(&key.as_str()))
            .collect();
        Self { host, vars }
    }

    pub fn host(&self) -> HostOs {
        self.host
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}
