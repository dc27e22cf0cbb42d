//! External process boundary.
//!
//! The pipeline never talks to `std::process` directly; it goes through the
//! [`ToolRunner`] trait so tests can substitute a recording fake and assert
//! on the exact invocations (including that none happened at all).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::command::Invocation;
use crate::types::{Error, Result};

/// Executes constructed invocations.
pub trait ToolRunner {
    /// Runs one invocation to completion, surfacing a non-zero exit as
    /// [`Error::Tool`].
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

/// Real runner: synchronous, blocking child processes rooted at the project
/// directory, stdio inherited so build output streams through.
pub struct SystemRunner {
    root: PathBuf,
}

impl SystemRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&self.root)
            .status()
            .map_err(|source| Error::Spawn {
                tool: invocation.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Tool {
                tool: invocation.program.clone(),
                // A signal-terminated child carries no code.
                code: status.code().unwrap_or(1),
            })
        }
    }
}
