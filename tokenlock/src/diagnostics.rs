//! Fault reporting.
//!
//! Faults pile up here during the run. The first one decides the lock's fate:
//! once anything has been reported, the controller stops evaluating codes and
//! fails open. The full list is written to the diagnostic log exactly once, on
//! the way into fail-open mode.

use log::{debug, error, warn};
use time::PrimitiveDateTime;
use crate::storage::{Storage, StorageResult};
use crate::usage::TIMESTAMP_FORMAT;

#[derive(Debug)]
pub struct Diagnostics {
    storage: Box<dyn Storage>,
    file: String,
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn new(storage: Box<dyn Storage>, file: impl Into<String>) -> Self {
        Diagnostics {
            storage,
            file: file.into(),
            messages: Vec::new(),
        }
    }

    /// Initializes the backend and makes sure the log file exists.
    pub fn prepare(&mut self) -> StorageResult<()> {
        self.storage.initialize()?;
        if !self.storage.exists(&self.file) {
            debug!("Diagnostic log {:?} not found, creating it.", self.file);
            self.storage.create(&self.file)?;
        }
        Ok(())
    }

    pub fn report(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.messages.push(message);
    }

    /// Like [Diagnostics::report], but ignores a message that is already pending.
    pub fn report_once(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.messages.contains(&message) {
            debug!("Fault already reported: {}", message);
            return;
        }
        self.report(message);
    }

    pub fn has_faults(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Appends every reported message to the diagnostic log, stamped with `now`
    /// when the clock is usable.
    pub fn flush(&mut self, now: Option<PrimitiveDateTime>) {
        // Same timestamp format as the registry, so both files line up.
        let stamp = now
            .and_then(|now| now.format(TIMESTAMP_FORMAT).ok())
            .unwrap_or_else(|| "unknown time".to_string());
        for message in &self.messages {
            let line = format!("@{} {}", stamp, message);
            if let Err(e) = self.storage.append_line(&self.file, &line) {
                warn!("Couldn't write to the diagnostic log: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemStorage;
    use time::macros::datetime;

    #[test]
    fn reported_messages_are_flushed_with_a_stamp() {
        let storage = MemStorage::default();
        let files = storage.clone();
        let mut diagnostics = Diagnostics::new(Box::new(storage), "log.txt");
        diagnostics.prepare().unwrap();
        assert!(!diagnostics.has_faults());

        diagnostics.report("Couldn't initialize usage storage");
        diagnostics.report("RTC date is not valid");
        diagnostics.flush(Some(datetime!(2024-05-01 08:00:00)));

        assert!(diagnostics.has_faults());
        assert_eq!(files.lines("log.txt"), Some(vec![
            "@2024-05-01T08:00:00 Couldn't initialize usage storage".to_string(),
            "@2024-05-01T08:00:00 RTC date is not valid".to_string(),
        ]));
    }

    #[test]
    fn flush_without_clock_still_writes() {
        let storage = MemStorage::with_file("log.txt", &[]);
        let files = storage.clone();
        let mut diagnostics = Diagnostics::new(Box::new(storage), "log.txt");

        diagnostics.report("RTC date is not valid");
        diagnostics.flush(None);

        assert_eq!(files.lines("log.txt"), Some(vec!["@unknown time RTC date is not valid".to_string()]));
    }

    #[test]
    fn repeated_faults_are_kept_once() {
        let storage = MemStorage::with_file("log.txt", &[]);
        let files = storage.clone();
        let mut diagnostics = Diagnostics::new(Box::new(storage), "log.txt");

        diagnostics.report_once("RTC date is not valid");
        diagnostics.report_once("RTC date is not valid");
        diagnostics.report_once("Storage can't be cleared");
        diagnostics.flush(None);

        assert_eq!(diagnostics.messages().len(), 2);
        assert_eq!(files.lines("log.txt").map(|l| l.len()), Some(2));
    }

    #[test]
    fn failing_storage_does_not_lose_messages() {
        let storage = MemStorage::with_file("log.txt", &[]);
        storage.fail_writes();
        let mut diagnostics = Diagnostics::new(Box::new(storage), "log.txt");

        diagnostics.report("Storage can't be cleared");
        diagnostics.flush(None);

        assert_eq!(diagnostics.messages(), ["Storage can't be cleared"]);
    }
}
