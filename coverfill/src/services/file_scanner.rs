//! Audio file scanner
//!
//! Recursive MP3 discovery under the catalog root. Entries are visited in
//! file-name order so two scans of an unmodified tree return the same
//! sequence.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Root could not be traversed
    #[error("I/O error {0}: {1}")]
    Io(PathBuf, String),
}

/// Enumerates candidate audio files under a root
pub trait Catalog: Send + Sync {
    fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError>;
}

/// Walkdir-backed catalog of MP3 files
pub struct FileScanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
}

impl FileScanner {
    /// Scanner that skips OS metadata, VCS folders and NAS thumbnail
    /// directories (`@eaDir`, `.AppleDouble`)
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".AppleDouble".to_string(),
                "@eaDir".to_string(),
            ],
            max_depth: None,
        }
    }

    /// Limit recursion depth (root is depth 0)
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Check if entry should be processed
    fn should_process_entry(
        &self,
        entry: &DirEntry,
        symlink_visited: &mut HashSet<PathBuf>,
    ) -> bool {
        let file_name = entry.file_name().to_string_lossy();

        // The root itself is never filtered
        if entry.depth() > 0 {
            for pattern in &self.ignore_patterns {
                if file_name.contains(pattern.as_str()) {
                    return false;
                }
            }
        }

        // Detect symlink loops
        if entry.path_is_symlink() {
            if let Ok(canonical) = entry.path().canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", entry.path().display());
                    return false;
                }
            }
        }

        true
    }

    /// Check if extension is a supported container
    fn is_supported_extension(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("mp3"))
            .unwrap_or(false)
    }
}

impl Catalog for FileScanner {
    fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut files = Vec::new();
        let mut symlink_visited = HashSet::new();

        let walker = WalkDir::new(root_path)
            .follow_links(true)
            .sort_by_file_name()
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && Self::is_supported_extension(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) if e.depth() == 0 => {
                    return Err(ScanError::Io(root_path.to_path_buf(), e.to_string()));
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    // Continue scanning, don't abort
                }
            }
        }

        tracing::debug!(
            root = %root_path.display(),
            files = files.len(),
            "Catalog scan complete"
        );

        Ok(files)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}
