//! Set of files that reached a terminal state
//!
//! Grows monotonically for the life of the process. With a journal path the
//! set survives restarts: every insert is appended to a newline-delimited
//! log and flushed before `insert` returns, and `open` replays the log.
//! Lines are raw path bytes on Unix, so non-UTF-8 names replay exactly.

use crate::error::{EnrichError, EnrichResult};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

struct Journal {
    path: PathBuf,
    file: File,
}

/// Paths settled in this run (and earlier runs, when journaled)
pub struct ProcessedSet {
    settled: HashSet<PathBuf>,
    journal: Option<Journal>,
}

impl ProcessedSet {
    /// Process-lifetime set with no journal
    pub fn in_memory() -> Self {
        Self {
            settled: HashSet::new(),
            journal: None,
        }
    }

    /// Replay `journal_path` (if it exists) and append to it from now on
    pub fn open(journal_path: &Path) -> EnrichResult<Self> {
        let fault = |e: std::io::Error| EnrichError::StateFile(journal_path.to_path_buf(), e.to_string());

        let settled: HashSet<PathBuf> = match fs::read(journal_path) {
            Ok(contents) => contents
                .split(|&b| b == b'\n')
                .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
                .map(decode_line)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(fault(e)),
        };

        if let Some(parent) = journal_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(fault)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(journal_path)
            .map_err(fault)?;

        tracing::info!(
            path = %journal_path.display(),
            replayed = settled.len(),
            "Loaded processed-file journal"
        );

        Ok(Self {
            settled,
            journal: Some(Journal {
                path: journal_path.to_path_buf(),
                file,
            }),
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.settled.contains(path)
    }

    /// Mark `path` settled; returns false if it already was
    ///
    /// The journal line is flushed before this returns.
    pub fn insert(&mut self, path: &Path) -> EnrichResult<bool> {
        if self.settled.contains(path) {
            return Ok(false);
        }

        if let Some(journal) = self.journal.as_mut() {
            // Unrepresentable paths stay in memory only
            match encode_line(path) {
                Some(line) if line.contains(&b'\n') => {
                    tracing::warn!(path = %path.display(), "Path contains a newline, not journaled");
                }
                Some(mut line) => {
                    line.push(b'\n');
                    journal
                        .file
                        .write_all(&line)
                        .and_then(|_| journal.file.flush())
                        .map_err(|e| EnrichError::StateFile(journal.path.clone(), e.to_string()))?;
                }
                None => {
                    tracing::warn!(path = %path.display(), "Path is not valid UTF-8, not journaled");
                }
            }
        }

        self.settled.insert(path.to_path_buf());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.settled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.as_ref().map(|j| j.path.as_path())
    }
}

#[cfg(unix)]
fn encode_line(path: &Path) -> Option<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Some(path.as_os_str().as_bytes().to_vec())
}

#[cfg(not(unix))]
fn encode_line(path: &Path) -> Option<Vec<u8>> {
    path.to_str().map(|s| s.as_bytes().to_vec())
}

#[cfg(unix)]
fn decode_line(line: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(line))
}

#[cfg(not(unix))]
fn decode_line(line: &[u8]) -> PathBuf {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    PathBuf::from(String::from_utf8_lossy(line).into_owned())
}

impl Default for ProcessedSet {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_insert_is_idempotent() {
        let mut set = ProcessedSet::in_memory();
        assert!(set.insert(Path::new("/music/a.mp3")).unwrap());
        assert!(!set.insert(Path::new("/music/a.mp3")).unwrap());
        assert!(set.contains(Path::new("/music/a.mp3")));
        assert!(!set.contains(Path::new("/music/b.mp3")));
        assert_eq!(set.len(), 1);
        assert!(set.journal_path().is_none());
    }

    #[test]
    fn test_journal_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let journal = dir.path().join("state/settled.log");

        {
            let mut set = ProcessedSet::open(&journal).unwrap();
            assert!(set.is_empty());
            set.insert(Path::new("/music/a.mp3")).unwrap();
            set.insert(Path::new("/music/b c.mp3")).unwrap();
            set.insert(Path::new("/music/a.mp3")).unwrap();
        }

        let reopened = ProcessedSet::open(&journal).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.contains(Path::new("/music/a.mp3")));
        assert!(reopened.contains(Path::new("/music/b c.mp3")));

        // Duplicate insert was not journaled twice
        let contents = std::fs::read_to_string(&journal).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_replays_exactly() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let journal = dir.path().join("settled.log");
        // Latin-1 "café.mp3"
        let path = Path::new(OsStr::from_bytes(b"/music/caf\xe9.mp3"));

        ProcessedSet::open(&journal).unwrap().insert(path).unwrap();

        let reopened = ProcessedSet::open(&journal).unwrap();
        assert!(reopened.contains(path));
        assert!(!reopened.contains(Path::new("/music/caf\u{fffd}.mp3")));
        assert_eq!(std::fs::read(&journal).unwrap(), b"/music/caf\xe9.mp3\n");
    }

    #[test]
    fn test_newline_path_kept_in_memory_only() {
        let dir = TempDir::new().unwrap();
        let journal = dir.path().join("settled.log");

        let mut set = ProcessedSet::open(&journal).unwrap();
        assert!(set.insert(Path::new("/music/two\nlines.mp3")).unwrap());
        assert!(set.contains(Path::new("/music/two\nlines.mp3")));

        assert!(ProcessedSet::open(&journal).unwrap().is_empty());
    }

    #[test]
    fn test_blank_journal_lines_ignored() {
        let dir = TempDir::new().unwrap();
        let journal = dir.path().join("settled.log");
        std::fs::write(&journal, "/music/a.mp3\n\n   \n/music/b.mp3\n").unwrap();

        let set = ProcessedSet::open(&journal).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_unreadable_journal_is_fault() {
        let dir = TempDir::new().unwrap();
        // A directory where the journal file should be
        let journal = dir.path().join("settled.log");
        std::fs::create_dir(&journal).unwrap();

        assert!(matches!(
            ProcessedSet::open(&journal),
            Err(EnrichError::StateFile(_, _))
        ));
    }
}
