use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use log::{debug, info};
use crate::storage::{split_lines, Storage, StorageError, StorageResult};

/// Where a [FsStorage] directory lives, which decides how it gets initialized.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FsLocation {
    Internal { create_if_missing: bool },
    Removable,
}

/// Storage backed by plain files in one directory.
#[derive(Debug)]
pub struct FsStorage {
    root: PathBuf,
    location: FsLocation,
}

impl FsStorage {
    pub fn internal(root: impl Into<PathBuf>, create_if_missing: bool) -> Self {
        FsStorage {
            root: root.into(),
            location: FsLocation::Internal { create_if_missing },
        }
    }

    pub fn removable(mount_point: impl Into<PathBuf>) -> Self {
        FsStorage {
            root: mount_point.into(),
            location: FsLocation::Removable,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn backend_name(&self) -> &'static str {
        match self.location {
            FsLocation::Internal { .. } => "internal",
            FsLocation::Removable => "removable",
        }
    }
}

impl Storage for FsStorage {
    fn initialize(&mut self) -> StorageResult<()> {
        if self.root.is_dir() {
            debug!("{} storage ready at {}.", self.backend_name(), self.root.display());
            return Ok(());
        }

        match self.location {
            FsLocation::Internal { create_if_missing: true } => {
                fs::create_dir_all(&self.root)
                    .map_err(|e| StorageError::io("create directory", &self.root.to_string_lossy(), e))?;
                info!("Created storage directory {}.", self.root.display());
                Ok(())
            }
            _ => Err(StorageError::Unavailable {
                backend: self.backend_name(),
                path: self.root.clone(),
            }),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn create(&mut self, name: &str) -> StorageResult<()> {
        File::create(self.path(name)).map_err(|e| StorageError::io("create", name, e))?;
        Ok(())
    }

    fn read_lines(&self, name: &str) -> StorageResult<Vec<String>> {
        let contents = fs::read(self.path(name)).map_err(|e| StorageError::io("read", name, e))?;
        Ok(split_lines(&String::from_utf8_lossy(&contents)))
    }

    fn append_line(&mut self, name: &str, line: &str) -> StorageResult<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(self.path(name))
            .map_err(|e| StorageError::io("open", name, e))?;
        writeln!(file, "{}", line).map_err(|e| StorageError::io("append to", name, e))?;
        file.sync_data().map_err(|e| StorageError::io("sync", name, e))?;
        Ok(())
    }

    fn truncate(&mut self, name: &str) -> StorageResult<()> {
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.path(name))
            .map_err(|e| StorageError::io("truncate", name, e))?;
        Ok(())
    }
}
