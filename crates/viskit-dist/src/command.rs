//! Invocation synthesis.
//!
//! Every external command the pipeline runs is constructed here as a pure
//! function of `(BuildConfiguration, TargetSpec, EnvSnapshot)`: no side
//! effects, no reads of the live environment. Identical inputs produce a
//! byte-identical argument vector, which is what makes invocations
//! reproducible and directly assertable in tests.

use std::fmt;

use crate::config::BuildConfiguration;
use crate::platform::{ACTION_ENV_ALLOWLIST, EnvSnapshot};
use crate::registry::TargetSpec;

/// Source feed for the dependency fetcher.
const NUGET_SOURCE: &str = "https://api.nuget.org/v3/index.json";

/// One fully constructed external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Constructs the build invocation for one target.
///
/// Argument construction order is fixed:
///
/// 1. startup options (host path-length mitigation, then caller startup
///    passthroughs);
/// 2. `build -c <mode>` plus linker options;
/// 3. allow-listed `--action_env` forwards present in the snapshot;
/// 4. verbosity-derived diagnostic flags;
/// 5. caller build-option passthroughs, appended last so they override
///    everything structural;
/// 6. target-specific flags and exactly one build-graph label.
pub fn bazel_build(
    config: &BuildConfiguration,
    spec: &TargetSpec,
    env: &EnvSnapshot,
) -> Invocation {
    let mut args = startup_args(&config.startup_opts, env);

    args.push("build".to_string());
    args.push("-c".to_string());
    args.push(config.compilation_mode.as_str().to_string());
    for linkopt in &config.linkopts {
        args.push(format!("--linkopt={}", linkopt));
    }

    for key in ACTION_ENV_ALLOWLIST {
        let Some(value) = env.get(key) else { continue };
        args.push("--action_env".to_string());
        if key == "PYTHON_BIN_PATH" {
            // Bazel on Windows expects a forward-slash interpreter path.
            args.push(format!("{}={}", key, value.replace('\\', "/")));
        } else {
            // Forwarded by name; the build tool reads the value itself.
            args.push(key.to_string());
        }
    }

    if config.verbosity > 1 {
        args.push("--verbose_failures".to_string());
    }
    if config.verbosity > 2 {
        args.push("--sandbox_debug".to_string());
    }

    args.extend(config.build_opts.iter().cloned());

    args.extend(spec.flags(config, env.host()));
    args.push(spec.label.to_string());

    Invocation::new("bazel", args)
}

/// Constructs the cache-expunging clean invocation.
pub fn bazel_clean(startup_opts: &[String], env: &EnvSnapshot) -> Invocation {
    let mut args = startup_args(startup_opts, env);
    args.push("clean".to_string());
    args.push("--expunge".to_string());
    Invocation::new("bazel", args)
}

/// Constructs the dependency-cache restore invocation.
pub fn nuget_restore(cache_dir: &str) -> Invocation {
    Invocation::new(
        "nuget",
        ["install", "-o", cache_dir, "-Source", NUGET_SOURCE]
            .map(str::to_string)
            .to_vec(),
    )
}

fn startup_args(startup_opts: &[String], env: &EnvSnapshot) -> Vec<String> {
    let mut args = Vec::new();
    if env.host().is_windows() {
        // Keep output paths short; deep Bazel output trees overflow the
        // Windows path limit.
        args.push("--output_user_root".to_string());
        args.push("C:/_bzl".to_string());
    }
    args.extend(startup_opts.iter().cloned());
    args
}
