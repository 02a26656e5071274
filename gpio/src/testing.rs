use std::cell::Cell;
use crate::{GpioError, GpioInput, GpioResult};

/// An input whose level is set by the test.
#[derive(Debug, Default)]
pub struct FakeInput {
    level: Cell<bool>,
    failing: Cell<bool>,
}

impl FakeInput {
    pub fn set(&self, level: bool) {
        self.level.set(level);
    }

    pub fn fail(&self) {
        self.failing.set(true);
    }
}

impl GpioInput for FakeInput {
    fn read(&self) -> GpioResult<bool> {
        if self.failing.get() {
            return Err(GpioError::Io(std::io::ErrorKind::BrokenPipe));
        }
        Ok(self.level.get())
    }
}
