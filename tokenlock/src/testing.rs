//! In-memory stand-ins for the peripherals, shared between test modules.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use time::PrimitiveDateTime;
use tokenlock_gpio::{GpioError, GpioOutput, GpioResult};
use crate::clock::Clock;
use crate::input::InputSource;
use crate::lock::LockActuator;
use crate::storage::{Storage, StorageError, StorageResult, MIN_LINE_LEN};

#[derive(Debug, Default)]
struct MemFiles {
    files: HashMap<String, Vec<String>>,
    fail_init: bool,
    fail_writes: bool,
}

/// Storage kept in memory. Clones share the same files, so a test can keep
/// one handle while the code under test owns another.
#[derive(Debug, Default, Clone)]
pub struct MemStorage {
    inner: Rc<RefCell<MemFiles>>,
}

impl MemStorage {
    pub fn with_file(name: &str, lines: &[&str]) -> Self {
        let storage = MemStorage::default();
        storage.inner.borrow_mut().files.insert(
            name.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        storage
    }

    pub fn lines(&self, name: &str) -> Option<Vec<String>> {
        self.inner.borrow().files.get(name).cloned()
    }

    pub fn fail_init(&self) {
        self.inner.borrow_mut().fail_init = true;
    }

    pub fn fail_writes(&self) {
        self.inner.borrow_mut().fail_writes = true;
    }

    fn check_writable(&self, op: &'static str, name: &str) -> StorageResult<()> {
        let inner = self.inner.borrow();
        if inner.fail_writes {
            return Err(StorageError::io(op, name, ErrorKind::PermissionDenied.into()));
        }
        if !inner.files.contains_key(name) && op != "create" {
            return Err(StorageError::io(op, name, ErrorKind::NotFound.into()));
        }
        Ok(())
    }
}

impl Storage for MemStorage {
    fn initialize(&mut self) -> StorageResult<()> {
        if self.inner.borrow().fail_init {
            return Err(StorageError::Unavailable { backend: "memory", path: PathBuf::new() });
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.borrow().files.contains_key(name)
    }

    fn create(&mut self, name: &str) -> StorageResult<()> {
        self.check_writable("create", name)?;
        self.inner.borrow_mut().files.insert(name.to_string(), Vec::new());
        Ok(())
    }

    fn read_lines(&self, name: &str) -> StorageResult<Vec<String>> {
        let inner = self.inner.borrow();
        let lines = inner
            .files
            .get(name)
            .ok_or_else(|| StorageError::io("read", name, ErrorKind::NotFound.into()))?;
        Ok(lines.iter().filter(|l| l.len() >= MIN_LINE_LEN).cloned().collect())
    }

    fn append_line(&mut self, name: &str, line: &str) -> StorageResult<()> {
        self.check_writable("append to", name)?;
        if let Some(lines) = self.inner.borrow_mut().files.get_mut(name) {
            lines.push(line.to_string());
        }
        Ok(())
    }

    fn truncate(&mut self, name: &str) -> StorageResult<()> {
        self.check_writable("truncate", name)?;
        if let Some(lines) = self.inner.borrow_mut().files.get_mut(name) {
            lines.clear();
        }
        Ok(())
    }
}

/// A clock the test sets by hand.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: Cell<Option<PrimitiveDateTime>>,
}

impl FakeClock {
    pub fn at(now: PrimitiveDateTime) -> Self {
        FakeClock { now: Cell::new(Some(now)) }
    }

    pub fn invalid() -> Self {
        FakeClock::default()
    }

    pub fn set(&self, now: Option<PrimitiveDateTime>) {
        self.now.set(now);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Option<PrimitiveDateTime> {
        self.now.get()
    }
}

/// A lock that remembers how long it was opened each time.
#[derive(Debug, Default, Clone)]
pub struct FakeLock {
    openings: Rc<RefCell<Vec<Duration>>>,
}

impl FakeLock {
    pub fn openings(&self) -> Vec<Duration> {
        self.openings.borrow().clone()
    }
}

impl LockActuator for FakeLock {
    fn actuate(&mut self, duration: Duration) -> GpioResult<()> {
        self.openings.borrow_mut().push(duration);
        Ok(())
    }
}

/// An output that records every level written to it.
#[derive(Debug, Default)]
pub struct FakeOutput {
    pub writes: RefCell<Vec<bool>>,
}

impl GpioOutput for FakeOutput {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.writes.borrow_mut().push(value);
        Ok(())
    }
}

/// Hands out prepared codes, then fails once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    codes: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new(codes: &[&str]) -> Self {
        ScriptedInput { codes: codes.iter().map(|c| c.to_string()).collect() }
    }
}

impl InputSource for ScriptedInput {
    fn read_code(&mut self) -> GpioResult<String> {
        self.codes
            .pop_front()
            .ok_or_else(|| GpioError::Other("no more input".to_string()))
    }
}
