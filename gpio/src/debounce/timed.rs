use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};
use crate::{GpioInput, GpioResult};

/// A debounced GPIO input that uses a timer to filter out contact bounce.
///
/// A new level is only reported once the raw input has held it for at least
/// [TimedDebounce::debounce_time]. Any flicker back to the reported level
/// restarts the wait.
pub struct TimedDebounce<'a> {
    input: &'a dyn GpioInput,
    stable: Cell<bool>,
    changed_since: Cell<Option<Instant>>,
    pub debounce_time: Duration,
}

impl <'a> TimedDebounce<'a> {
    pub fn new(input: &'a dyn GpioInput) -> Self {
        Self {
            input,
            stable: Cell::new(false),
            changed_since: Cell::new(None),
            debounce_time: Duration::from_millis(50),
        }
    }

    pub fn with_debounce_time(mut self, debounce_time: Duration) -> Self {
        self.debounce_time = debounce_time;
        self
    }
}

impl Debug for TimedDebounce<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(debounced)", self.input)
    }
}

impl GpioInput for TimedDebounce<'_> {
    fn read(&self) -> GpioResult<bool> {
        let stable = self.stable.get();
        let raw = self.input.read()?;

        if raw == stable {
            self.changed_since.set(None);
            return Ok(stable);
        }

        match self.changed_since.get() {
            Some(since) if since.elapsed() >= self.debounce_time => {
                self.changed_since.set(None);
                self.stable.set(raw);
                Ok(raw)
            }
            Some(_) => Ok(stable),
            None if self.debounce_time.is_zero() => {
                self.stable.set(raw);
                Ok(raw)
            }
            None => {
                self.changed_since.set(Some(Instant::now()));
                Ok(stable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeInput;
    use std::thread::sleep;

    #[test]
    fn short_glitch_is_ignored() {
        let raw = FakeInput::default();
        let debounced = TimedDebounce::new(&raw).with_debounce_time(Duration::from_millis(20));

        raw.set(true);
        assert!(!debounced.read().unwrap());
        raw.set(false);
        assert!(!debounced.read().unwrap());
        sleep(Duration::from_millis(30));
        assert!(!debounced.read().unwrap());
    }

    #[test]
    fn held_level_is_reported_after_debounce_time() {
        let raw = FakeInput::default();
        let debounced = TimedDebounce::new(&raw).with_debounce_time(Duration::from_millis(10));

        raw.set(true);
        assert!(!debounced.read().unwrap());
        sleep(Duration::from_millis(20));
        assert!(debounced.read().unwrap());
        assert!(debounced.read().unwrap());
    }

    #[test]
    fn zero_debounce_time_passes_through() {
        let raw = FakeInput::default();
        let debounced = TimedDebounce::new(&raw).with_debounce_time(Duration::ZERO);

        raw.set(true);
        assert!(debounced.read().unwrap());
        raw.set(false);
        assert!(!debounced.read().unwrap());
    }

    #[test]
    fn read_errors_propagate() {
        let raw = FakeInput::default();
        raw.fail();
        let debounced = TimedDebounce::new(&raw);

        assert!(debounced.read().is_err());
    }
}
