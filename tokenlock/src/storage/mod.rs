//! Line-oriented file storage over interchangeable backends.
//!
//! The usage registry and the diagnostic log each get their own backend, picked
//! from the config by [StorageKind]. Every backend speaks the same small
//! vocabulary of whole-file operations, so the rest of the app never cares
//! whether a line ends up on the board's own filesystem, on a removable card,
//! or nowhere at all.

mod fs;
mod null;

use std::fmt::Debug;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
pub use fs::*;
pub use null::*;

/// Lines shorter than this are noise rather than records and are skipped on read.
pub const MIN_LINE_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{backend} storage is not available at {}", path.display())]
    Unavailable {
        backend: &'static str,
        path: PathBuf,
    },
    #[error("cannot {op} {name:?}: {source}")]
    Io {
        op: &'static str,
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(op: &'static str, name: &str, source: std::io::Error) -> Self {
        StorageError::Io { op, name: name.to_string(), source }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A backend holding named, newline-separated text files.
///
/// All operations are synchronous and there is no partial-write recovery; a
/// failure is reported to the caller and the file is left as the OS left it.
pub trait Storage: Debug {
    /// Prepares the backend for use.
    fn initialize(&mut self) -> StorageResult<()>;

    /// Checks whether the named file exists.
    fn exists(&self, name: &str) -> bool;

    /// Creates an empty file, truncating it if it already exists.
    fn create(&mut self, name: &str) -> StorageResult<()>;

    /// Reads every line of the file, in order, without the line terminators.
    ///
    /// Lines shorter than [MIN_LINE_LEN] are dropped.
    ///
    /// # Errors
    /// Only if the file cannot be opened or read.
    fn read_lines(&self, name: &str) -> StorageResult<Vec<String>>;

    /// Appends `line` followed by a line terminator.
    fn append_line(&mut self, name: &str, line: &str) -> StorageResult<()>;

    /// Erases the contents of an existing file.
    fn truncate(&mut self, name: &str) -> StorageResult<()>;
}

/// Which backend to use for a storage role, as written in the config file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageKind {
    /// A directory on the board's own filesystem.
    Internal {
        path: PathBuf,
        /// Creates the directory on startup if it is missing.
        #[serde(default)]
        create_if_missing: bool,
    },
    /// A directory on a mounted removable card. Never created by us, so a
    /// missing card surfaces as an initialization failure.
    Removable {
        mount_point: PathBuf,
    },
    /// Accepts everything, keeps nothing.
    Null,
}

impl StorageKind {
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StorageKind::Null)
    }

    /// Constructs the backend described by this config entry.
    pub fn open(&self) -> Box<dyn Storage> {
        match self {
            StorageKind::Internal { path, create_if_missing } => {
                Box::new(FsStorage::internal(path.clone(), *create_if_missing))
            }
            StorageKind::Removable { mount_point } => {
                Box::new(FsStorage::removable(mount_point.clone()))
            }
            StorageKind::Null => Box::new(NullStorage),
        }
    }
}

/// Splits raw file contents into lines the way every backend reports them.
///
/// A trailing `\r` is dropped so files edited on other systems still parse.
pub(crate) fn split_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.len() >= MIN_LINE_LEN)
        .map(str::to_string)
        .collect()
}
