use crate::storage::{Storage, StorageResult};

/// Storage that reports success for everything and stores nothing.
///
/// Meant for the diagnostic log on boards without a second store; the config
/// refuses to use it for both roles at once.
#[derive(Debug, Default)]
pub struct NullStorage;

impl Storage for NullStorage {
    fn initialize(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn exists(&self, _name: &str) -> bool {
        true
    }

    fn create(&mut self, _name: &str) -> StorageResult<()> {
        Ok(())
    }

    fn read_lines(&self, _name: &str) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn append_line(&mut self, _name: &str, _line: &str) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, _name: &str) -> StorageResult<()> {
        Ok(())
    }
}
