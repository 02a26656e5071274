//! The usage log: every token spent this period, oldest first.
//!
//! On disk each record is one line, the user's identifier followed directly by
//! the access time, e.g. `a2024-06-25T15:29:37`. In memory the log is the
//! source of truth for the rest of the run, even when writing it back fails.

use log::{debug, trace, warn};
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;
use crate::storage::{Storage, StorageError, StorageResult};

/// `YYYY-MM-DDTHH:MM:SS`, the timestamp part of a stored record.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// One granted access.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UsageRecord {
    pub identifier: char,
    /// `None` if the stored line had a timestamp that could not be parsed.
    pub timestamp: Option<PrimitiveDateTime>,
}

impl UsageRecord {
    pub fn new(identifier: char, timestamp: PrimitiveDateTime) -> Self {
        UsageRecord { identifier, timestamp: Some(timestamp) }
    }

    pub fn corrupt(identifier: char) -> Self {
        UsageRecord { identifier, timestamp: None }
    }

    /// Parses a stored line. Returns `None` only for an empty line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut chars = line.chars();
        let identifier = chars.next()?;
        match PrimitiveDateTime::parse(chars.as_str(), TIMESTAMP_FORMAT) {
            Ok(timestamp) => Some(UsageRecord::new(identifier, timestamp)),
            Err(e) => {
                trace!("Bad date in registry line {:?}: {}", line, e);
                Some(UsageRecord::corrupt(identifier))
            }
        }
    }

    /// Renders the stored line for an access.
    pub fn encode(identifier: char, timestamp: PrimitiveDateTime) -> Result<String, time::error::Format> {
        Ok(format!("{}{}", identifier, timestamp.format(TIMESTAMP_FORMAT)?))
    }
}

#[derive(Debug, Error)]
pub enum UsageLogError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("couldn't format the access time: {0}")]
    Format(#[from] time::error::Format),
    #[error("{count} line(s) of the registry file have an invalid date")]
    Corrupt { count: usize },
}

/// The usage log bound to one file of one storage backend.
#[derive(Debug)]
pub struct UsageLog {
    storage: Box<dyn Storage>,
    file: String,
    records: Vec<UsageRecord>,
}

impl UsageLog {
    pub fn new(storage: Box<dyn Storage>, file: impl Into<String>) -> Self {
        UsageLog {
            storage,
            file: file.into(),
            records: Vec::new(),
        }
    }

    /// Initializes the backend and makes sure the registry file exists.
    pub fn prepare(&mut self) -> StorageResult<()> {
        self.storage.initialize()?;
        if !self.storage.exists(&self.file) {
            debug!("Registry file {:?} not found, creating it.", self.file);
            self.storage.create(&self.file)?;
        }
        Ok(())
    }

    /// Replaces the in-memory records with the ones stored in the file.
    ///
    /// Lines with an unparsable date are still loaded, as records without a
    /// timestamp, and reported once as [UsageLogError::Corrupt].
    pub fn load(&mut self) -> Result<(), UsageLogError> {
        let lines = self.storage.read_lines(&self.file)?;
        self.records = lines.iter().filter_map(|line| UsageRecord::parse(line)).collect();

        let count = self.records.iter().filter(|r| r.timestamp.is_none()).count();
        debug!("Loaded {} usage record(s).", self.records.len());
        if count > 0 {
            return Err(UsageLogError::Corrupt { count });
        }
        Ok(())
    }

    /// Records an access and writes it to storage.
    ///
    /// The record stays in memory even if the write fails.
    pub fn append(&mut self, identifier: char, timestamp: PrimitiveDateTime) -> Result<(), UsageLogError> {
        self.records.push(UsageRecord::new(identifier, timestamp));
        let line = UsageRecord::encode(identifier, timestamp)?;
        self.storage.append_line(&self.file, &line)?;
        Ok(())
    }

    /// Forgets every record, in memory and in storage.
    ///
    /// The in-memory log is emptied even if the file can't be truncated.
    pub fn clear(&mut self) -> StorageResult<()> {
        self.records.clear();
        self.storage.truncate(&self.file).inspect_err(|e| {
            warn!("Registry file could not be cleared: {}", e);
        })
    }

    pub fn most_recent(&self) -> Option<&UsageRecord> {
        self.records.last()
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemStorage;
    use time::macros::datetime;

    #[test]
    fn records_are_encoded_as_identifier_and_iso_timestamp() {
        assert_eq!(
            UsageRecord::encode('a', datetime!(2020-06-25 15:29:37)).unwrap(),
            "a2020-06-25T15:29:37",
        );
        assert_eq!(
            UsageRecord::parse("a2020-06-25T15:29:37"),
            Some(UsageRecord::new('a', datetime!(2020-06-25 15:29:37))),
        );
    }

    #[test]
    fn encoding_pads_every_field() {
        assert_eq!(
            UsageRecord::encode('b', datetime!(2024-01-02 03:04:05)).unwrap(),
            "b2024-01-02T03:04:05",
        );
        let line = UsageRecord::encode('c', datetime!(2024-12-31 23:59:59)).unwrap();
        assert_eq!(UsageRecord::parse(&line), Some(UsageRecord::new('c', datetime!(2024-12-31 23:59:59))));
    }

    #[test]
    fn bad_dates_parse_as_corrupt_records() {
        assert_eq!(UsageRecord::parse("a2020-13-25T15:29:37"), Some(UsageRecord::corrupt('a')));
        assert_eq!(UsageRecord::parse("bnot a date at all"), Some(UsageRecord::corrupt('b')));
        assert_eq!(UsageRecord::parse(""), None);
    }

    #[test]
    fn load_keeps_file_order() {
        let storage = MemStorage::with_file("registry.txt", &[
            "a2024-05-01T08:00:00",
            "b2024-05-03T08:00:00",
            "a2024-05-02T08:00:00",
        ]);
        let mut log = UsageLog::new(Box::new(storage), "registry.txt");

        log.load().unwrap();

        assert_eq!(log.records().len(), 3);
        assert_eq!(
            log.most_recent(),
            Some(&UsageRecord::new('a', datetime!(2024-05-02 08:00:00))),
        );
    }

    #[test]
    fn corrupt_lines_are_reported_once() {
        let storage = MemStorage::with_file("registry.txt", &[
            "a2024-05-01T08:00:00",
            "a2024-05-xxT08:00:00",
            "b2024-99-01T08:00:00",
        ]);
        let mut log = UsageLog::new(Box::new(storage), "registry.txt");

        assert!(matches!(log.load(), Err(UsageLogError::Corrupt { count: 2 })));
        assert_eq!(log.records().len(), 3);
        assert_eq!(log.most_recent(), Some(&UsageRecord::corrupt('b')));
    }

    #[test]
    fn prepare_creates_missing_registry() {
        let storage = MemStorage::default();
        let files = storage.clone();
        let mut log = UsageLog::new(Box::new(storage), "registry.txt");

        log.prepare().unwrap();
        log.load().unwrap();

        assert!(log.records().is_empty());
        assert_eq!(files.lines("registry.txt"), Some(vec![]));
    }

    #[test]
    fn append_writes_through() {
        let storage = MemStorage::with_file("registry.txt", &[]);
        let files = storage.clone();
        let mut log = UsageLog::new(Box::new(storage), "registry.txt");

        log.append('a', datetime!(2024-05-01 08:00:00)).unwrap();

        assert_eq!(files.lines("registry.txt"), Some(vec!["a2024-05-01T08:00:00".to_string()]));
        assert_eq!(log.records().len(), 1);
    }

    #[test]
    fn failed_append_keeps_record_in_memory() {
        let storage = MemStorage::with_file("registry.txt", &[]);
        storage.fail_writes();
        let mut log = UsageLog::new(Box::new(storage), "registry.txt");

        assert!(matches!(
            log.append('a', datetime!(2024-05-01 08:00:00)),
            Err(UsageLogError::Storage(_)),
        ));
        assert_eq!(
            log.most_recent(),
            Some(&UsageRecord::new('a', datetime!(2024-05-01 08:00:00))),
        );
    }

    #[test]
    fn clear_empties_memory_even_if_storage_fails() {
        let storage = MemStorage::with_file("registry.txt", &["a2024-05-01T08:00:00"]);
        let files = storage.clone();
        let mut log = UsageLog::new(Box::new(storage), "registry.txt");
        log.load().unwrap();

        log.clear().unwrap();
        assert!(log.records().is_empty());
        assert_eq!(files.lines("registry.txt"), Some(vec![]));

        log.append('a', datetime!(2024-06-01 08:00:00)).unwrap();
        files.fail_writes();
        assert!(log.clear().is_err());
        assert!(log.most_recent().is_none());
    }
}
