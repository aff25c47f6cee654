// src/file_map.rs

//! Workspace file discovery for the standalone binary.
//!
//! Walks each project directory, digests every file with blake3 and builds
//! the [`ProjectFileMap`] the in-process hasher consumes. Embedders with
//! their own file discovery construct the map directly and skip this module.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blake3::Hasher;
use tracing::debug;

use crate::errors::Result;
use crate::project::{FileData, ProjectFileMap, ProjectGraph};

/// Compute the content digest of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {path:?}"))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Build the per-project file map by walking every project root.
///
/// Hidden entries (dot-prefixed) are skipped, which also keeps cache and VCS
/// directories out of fingerprints. A missing project directory yields an
/// empty listing rather than an error.
pub fn build_project_file_map(
    workspace_root: &Path,
    project_graph: &ProjectGraph,
) -> Result<ProjectFileMap> {
    let mut file_map = ProjectFileMap::new();
    for (name, node) in &project_graph.nodes {
        let project_root = workspace_root.join(&node.root);
        let mut files = Vec::new();
        if project_root.is_dir() {
            collect_files(&project_root, &project_root, &mut files)?;
        }
        // Listing order must be stable for fingerprinting.
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(project = %name, files = files.len(), "collected project files");
        file_map.insert(name.clone(), files);
    }
    Ok(file_map)
}

fn collect_files(project_root: &Path, dir: &Path, out: &mut Vec<FileData>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading directory {dir:?}"))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("reading directory entry in {dir:?}"))?
            .path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            collect_files(project_root, &path, out)?;
        } else if path.is_file() {
            out.push(FileData {
                path: relative_display(project_root, &path),
                hash: compute_file_hash(&path)?,
            });
        }
    }
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn relative_display(root: &Path, path: &Path) -> String {
    let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    relative.to_string_lossy().replace('\\', "/")
}
