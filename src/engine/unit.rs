//! engine::unit
//!
//! The set of files a publish commits: the manifest plus the publishable
//! part of the build output directory.
//!
//! # Design
//!
//! Files are read once, up front, so the remote tree is built from exactly
//! the bytes that were checked for changes. Paths are repository-relative
//! with `/` separators and entries are sorted by path.

use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::forge::{FileMode, TreeEntry};

/// Extensions of build output files that are published.
pub const PUBLISHABLE_EXTENSIONS: [&str; 4] = ["js", "cjs", "map", "json"];

/// Errors from collecting a publish unit.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("output directory not found: {}", .0.display())]
    MissingOutputDir(PathBuf),

    #[error("failed to walk '{}': {message}", .path.display())]
    Walk { path: PathBuf, message: String },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{}' is not UTF-8 text and cannot be published inline", .path.display())]
    NonUtf8 { path: PathBuf },

    #[error("'{}' is outside the repository root", .path.display())]
    OutsideRoot { path: PathBuf },
}

/// One file of a publish unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFile {
    /// Repository-relative path with `/` separators
    pub path: String,
    pub mode: FileMode,
    pub content: String,
}

impl From<&PublishFile> for TreeEntry {
    fn from(file: &PublishFile) -> Self {
        TreeEntry {
            path: file.path.clone(),
            mode: file.mode,
            content: file.content.clone(),
        }
    }
}

/// Files to commit in one publish, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishUnit {
    files: Vec<PublishFile>,
}

impl PublishUnit {
    /// Read the manifest and every publishable file under `output_dir`.
    pub fn collect(root: &Path, manifest: &Path, output_dir: &Path) -> Result<Self, UnitError> {
        let mut files = Vec::new();
        for path in candidate_paths(manifest, output_dir)? {
            files.push(read_file(root, &path)?);
        }
        Ok(Self::from_files(files))
    }

    /// Build a unit from already-read files.
    pub fn from_files(mut files: Vec<PublishFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        Self { files }
    }

    pub fn files(&self) -> &[PublishFile] {
        &self.files
    }

    /// Repository-relative paths, in tree order.
    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Tree entries for the hosting API.
    pub fn tree_entries(&self) -> Vec<TreeEntry> {
        self.files.iter().map(TreeEntry::from).collect()
    }
}

/// Whether a build output file is published, judged by its extension.
pub fn is_publishable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PUBLISHABLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// The manifest followed by every publishable file under `output_dir`.
///
/// Output files come back in walk order sorted by file name. Symlinks are
/// not followed.
pub fn candidate_paths(manifest: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, UnitError> {
    if !output_dir.is_dir() {
        return Err(UnitError::MissingOutputDir(output_dir.to_path_buf()));
    }

    let mut paths = vec![manifest.to_path_buf()];
    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| UnitError::Walk {
            path: output_dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && is_publishable(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn read_file(root: &Path, path: &Path) -> Result<PublishFile, UnitError> {
    let bytes = fs::read(path).map_err(|source| UnitError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8(bytes).map_err(|_| UnitError::NonUtf8 {
        path: path.to_path_buf(),
    })?;
    let metadata = fs::metadata(path).map_err(|source| UnitError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(PublishFile {
        path: relative_path(root, path)?,
        mode: file_mode(&metadata),
        content,
    })
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> FileMode {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        FileMode::Executable
    } else {
        FileMode::Blob
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> FileMode {
    FileMode::Blob
}

fn relative_path(root: &Path, path: &Path) -> Result<String, UnitError> {
    let outside = || UnitError::OutsideRoot {
        path: path.to_path_buf(),
    };
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let relative = canonical
        .strip_prefix(&canonical_root)
        .or_else(|_| path.strip_prefix(root))
        .map_err(|_| outside())?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    if parts.is_empty() {
        return Err(outside());
    }
    Ok(parts.join("/"))
}
