//! The lock output.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;
use log::debug;
use tokenlock_gpio::{GpioOutput, GpioResult};

/// Something that can hold the lock open for a while.
pub trait LockActuator: Debug {
    /// Opens the lock, waits for `duration`, and closes it again.
    fn actuate(&mut self, duration: Duration) -> GpioResult<()>;
}

/// A lock driven by a single GPIO output, active while the output is set.
#[derive(Debug)]
pub struct GpioLock<'a> {
    output: &'a dyn GpioOutput,
}

impl <'a> GpioLock<'a> {
    pub fn new(output: &'a dyn GpioOutput) -> Self {
        GpioLock { output }
    }
}

impl LockActuator for GpioLock<'_> {
    fn actuate(&mut self, duration: Duration) -> GpioResult<()> {
        debug!("Opening lock for {:?}.", duration);
        self.output.write(true)?;
        thread::sleep(duration);
        self.output.write(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeOutput;

    #[test]
    fn actuation_asserts_then_releases() {
        let output = FakeOutput::default();
        let mut lock = GpioLock::new(&output);

        lock.actuate(Duration::from_millis(1)).unwrap();

        assert_eq!(*output.writes.borrow(), vec![true, false]);
    }
}
