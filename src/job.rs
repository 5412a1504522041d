//! Job variants moved through the engine's work channel
//!
//! A walk is decomposed into three kinds of work:
//! - a directory node to visit and descend into,
//! - a file node to visit (a leaf),
//! - a batch of raw directory-entry names that still need to be stat'd
//!   and dispatched as one of the above.
//!
//! Jobs are value types; ownership transfers through the channel and the
//! handler consumes them.

use std::fmt;
use std::fs::Metadata;
use std::path::PathBuf;
use std::time::SystemTime;

/// Metadata snapshot for one visited entry, handed to the visitor.
#[derive(Clone, Debug)]
pub struct EntryInfo {
    name: String,
    size: u64,
    modified: Option<SystemTime>,
    mode: u32,
    is_dir: bool,
}

impl EntryInfo {
    pub(crate) fn from_metadata(name: String, metadata: &Metadata) -> Self {
        Self {
            name,
            size: metadata.len(),
            modified: metadata.modified().ok(),
            mode: mode_bits(metadata),
            is_dir: metadata.is_dir(),
        }
    }

    #[cfg(test)]
    pub(crate) fn synthetic(name: &str, size: u64, is_dir: bool) -> Self {
        Self {
            name: name.to_owned(),
            size,
            modified: None,
            mode: 0,
            is_dir,
        }
    }

    /// Bare entry name, without any path components.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, as reported by the filesystem.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time, when the filesystem reports one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Raw mode bits (zero on platforms without Unix permissions).
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &Metadata) -> u32 {
    0
}

/// One unit of work on the jobs channel.
#[derive(Clone, Debug)]
pub(crate) enum Job {
    /// A directory to visit and descend into.
    DirectoryNode {
        parent_path: PathBuf,
        info: EntryInfo,
    },

    /// A file to visit.
    FileNode {
        parent_path: PathBuf,
        info: EntryInfo,
    },

    /// A slice of entry names read from one directory, not yet stat'd.
    /// `process_files` carries the parent's path-filter verdict: when
    /// false, file children are dropped but directory children are still
    /// queued so deeper include rules can match.
    DirectoryContentsBatch {
        parent_full_path: PathBuf,
        batch_index: u64,
        child_names: Vec<String>,
        process_files: bool,
    },
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::DirectoryNode { parent_path, info } => write!(
                f,
                "DirectoryNode<parent=[{}] name=[{}]>",
                parent_path.display(),
                info.name()
            ),
            Job::FileNode { parent_path, info } => write!(
                f,
                "FileNode<parent=[{}] name=[{}]>",
                parent_path.display(),
                info.name()
            ),
            Job::DirectoryContentsBatch {
                parent_full_path,
                batch_index,
                child_names,
                ..
            } => write!(
                f,
                "DirectoryContentsBatch<parent=[{}] batch=({}) children=({})>",
                parent_full_path.display(),
                batch_index,
                child_names.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    #[test]
    fn entry_info_from_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        fs::write(&path, b"12345").unwrap();

        let metadata = fs::metadata(&path).unwrap();
        let info = EntryInfo::from_metadata("payload.bin".into(), &metadata);

        assert_eq!(info.name(), "payload.bin");
        assert_eq!(info.size(), 5);
        assert!(!info.is_dir());
        assert!(info.modified().is_some());
    }

    #[test]
    fn entry_info_from_directory_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = fs::metadata(dir.path()).unwrap();
        let info = EntryInfo::from_metadata("tmp".into(), &metadata);

        assert!(info.is_dir());
    }

    #[test]
    fn job_descriptions() {
        let file = Job::FileNode {
            parent_path: Path::new("/data").to_path_buf(),
            info: EntryInfo::synthetic("report.txt", 12, false),
        };
        assert_eq!(file.to_string(), "FileNode<parent=[/data] name=[report.txt]>");

        let batch = Job::DirectoryContentsBatch {
            parent_full_path: Path::new("/data/sub").to_path_buf(),
            batch_index: 3,
            child_names: vec!["a".into(), "b".into()],
            process_files: true,
        };
        assert_eq!(
            batch.to_string(),
            "DirectoryContentsBatch<parent=[/data/sub] batch=(3) children=(2)>"
        );
    }
}
