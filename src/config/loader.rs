// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::file::{RawWorkspaceFile, WorkspaceFile};
use crate::errors::Result;

/// Load a workspace file from a given path and return the raw
/// `RawWorkspaceFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (project references, runner definitions, etc.). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkspaceFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let file: RawWorkspaceFile = toml::from_str(&contents)?;

    Ok(file)
}

/// Load a workspace file from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown project references in `depends_on`,
///   - self-dependencies,
///   - runner definitions with empty module references.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkspaceFile> {
    let raw = load_from_path(&path)?;
    let file = WorkspaceFile::try_from(raw)?;
    Ok(file)
}

/// Helper to resolve a default workspace file path.
///
/// Currently this just returns `Rundag.toml` in the current working
/// directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Rundag.toml")
}
