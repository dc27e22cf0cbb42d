//! Artifact deployment.
//!
//! Moves build outputs between the build tool's output tree, the staging
//! area, and the installation tree. Every operation here is idempotent, and
//! the directory merge is strictly additive: files already present in the
//! destination that have no counterpart in the source are left untouched,
//! because the installation tree is shared across runs that install
//! different target subsets.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use walkdir::WalkDir;

use crate::console::Console;
use crate::types::{Error, Result};

/// Executes artifact movement on behalf of the pipeline.
pub struct Deployer<'a> {
    console: &'a Console,
}

impl<'a> Deployer<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Copies a single file, creating the destination directory if absent
    /// and setting its permission bits (Unix only).
    pub fn copy_file(&self, src: &Path, dest: &Path, mode: u32) -> Result<()> {
        self.console
            .debug(format!("Copying '{}' to '{}'...", src.display(), dest.display()));

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
        }
        fs::copy(src, dest).map_err(|e| Error::fs(src, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dest, fs::Permissions::from_mode(mode))
                .map_err(|e| Error::fs(dest, e))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(())
    }

    /// Recursively merges `src` into `dest`.
    ///
    /// Files are copied over existing ones; anything in `dest` that does not
    /// correspond to an entry in `src` survives the merge unchanged.
    pub fn merge_directory(&self, src: &Path, dest: &Path) -> Result<()> {
        self.console.debug(format!(
            "Merging '{}' into '{}'...",
            src.display(),
            dest.display()
        ));

        fs::create_dir_all(dest).map_err(|e| Error::fs(dest, e))?;

        for entry in WalkDir::new(src) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(src).to_path_buf();
                Error::fs(path, e.into())
            })?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .expect("walked entries live under their walk root");
            if rel.as_os_str().is_empty() {
                continue;
            }
            let target = dest.join(rel);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| Error::fs(&target, e))?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| Error::fs(entry.path(), e))?;
            }
        }

        Ok(())
    }

    /// Unpacks a zip build output into `dest`, creating directories as
    /// needed. Entry permission bits are preserved on Unix.
    pub fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<()> {
        self.console.debug(format!(
            "Unarchiving '{}' to '{}'...",
            archive.display(),
            dest.display()
        ));

        let file = File::open(archive).map_err(|e| Error::fs(archive, e))?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| Error::Archive {
            path: archive.to_path_buf(),
            message: e.to_string(),
        })?;

        fs::create_dir_all(dest).map_err(|e| Error::fs(dest, e))?;

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(|e| Error::Archive {
                path: archive.to_path_buf(),
                message: e.to_string(),
            })?;
            let Some(rel) = entry.enclosed_name() else {
                return Err(Error::Archive {
                    path: archive.to_path_buf(),
                    message: format!("entry {} escapes the destination", entry.name()),
                });
            };
            let target = dest.join(rel);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| Error::fs(&target, e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
            }
            let mut out = File::create(&target).map_err(|e| Error::fs(&target, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| Error::fs(&target, e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                        .map_err(|e| Error::fs(&target, e))?;
                }
            }
        }

        Ok(())
    }

    /// Removes a single installed artifact.
    pub fn remove_file(&self, path: &Path) -> Result<()> {
        self.console.debug(format!("Removing '{}'...", path.display()));
        fs::remove_file(path).map_err(|e| Error::fs(path, e))
    }

    /// Removes a subtree. A tree that is already absent is not an error.
    pub fn remove_tree(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            self.console.debug(format!(
                "Tried to remove '{}', but it does not exist",
                path.display()
            ));
            return Ok(());
        }
        self.console.debug(format!("Removing '{}'...", path.display()));
        fs::remove_dir_all(path).map_err(|e| Error::fs(path, e))
    }

    /// Uninstall primitive: removes the entries under `dir` matching
    /// `predicate`, preserving everything else. Matching directories are
    /// removed whole. With `recursive`, the whole subtree is scanned;
    /// otherwise only direct children.
    ///
    /// An absent `dir` removes nothing. Returns the number of entries
    /// removed.
    pub fn remove_matching<F>(&self, dir: &Path, recursive: bool, predicate: F) -> Result<usize>
    where
        F: Fn(&Path) -> bool,
    {
        if !dir.is_dir() {
            return Ok(0);
        }

        let matches: Vec<(std::path::PathBuf, bool)> = if recursive {
            let mut found = Vec::new();
            for entry in WalkDir::new(dir).min_depth(1) {
                let entry = entry.map_err(|e| {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    Error::fs(path, e.into())
                })?;
                if predicate(entry.path()) {
                    found.push((entry.path().to_path_buf(), entry.file_type().is_dir()));
                }
            }
            // Children of a matching directory go away with their parent.
            let matched_dirs: Vec<std::path::PathBuf> = found
                .iter()
                .filter(|(_, is_dir)| *is_dir)
                .map(|(path, _)| path.clone())
                .collect();
            found.retain(|(path, _)| {
                !matched_dirs
                    .iter()
                    .any(|dir| path != dir && path.starts_with(dir))
            });
            found
        } else {
            let mut found = Vec::new();
            let entries = fs::read_dir(dir).map_err(|e| Error::fs(dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| Error::fs(dir, e))?;
                let path = entry.path();
                if predicate(&path) {
                    let is_dir = path.is_dir();
                    found.push((path, is_dir));
                }
            }
            found
        };

        let count = matches.len();
        for (path, is_dir) in matches {
            if is_dir {
                self.remove_tree(&path)?;
            } else {
                self.remove_file(&path)?;
            }
        }
        Ok(count)
    }
}
