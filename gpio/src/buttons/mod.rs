//! A panel of symbol buttons plus a confirm button, read as a typed-in code.

use std::fmt::{Debug, Formatter};
use std::thread;
use std::time::Duration;
use log::{debug, trace};
use crate::{GpioInput, GpioResult};

/// A single button that types `symbol` when released.
pub struct SymbolButton<'a> {
    pub symbol: char,
    input: &'a dyn GpioInput,
    was_pressed: bool,
}

impl <'a> SymbolButton<'a> {
    pub fn new(symbol: char, input: &'a dyn GpioInput) -> Self {
        SymbolButton { symbol, input, was_pressed: false }
    }

    /// Returns `true` on the transition from pressed to released.
    fn released(&mut self) -> GpioResult<bool> {
        let pressed = self.input.read()?;
        let released = self.was_pressed && !pressed;
        self.was_pressed = pressed;
        Ok(released)
    }
}

impl Debug for SymbolButton<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymbolButton({:?}, {:?})", self.symbol, self.input)
    }
}

/// Assembles button presses into a complete code.
///
/// Symbols are appended when their button is released, so holding a button
/// types it once. Releasing the confirm button completes the code. Only one
/// symbol is taken per poll; the first released button in panel order wins.
///
/// The confirm button also acts on release, not on press, so a code is never
/// submitted while the confirm button is still held down.
///
/// Debouncing is the caller's job, usually by wrapping each line in a
/// [crate::debounce::TimedDebounce].
pub struct ButtonPanel<'a> {
    symbols: Vec<SymbolButton<'a>>,
    confirm: SymbolButton<'a>,
    buffer: String,
    pub poll_interval: Duration,
}

impl <'a> ButtonPanel<'a> {
    pub fn new(symbols: Vec<SymbolButton<'a>>, confirm: &'a dyn GpioInput) -> Self {
        ButtonPanel {
            symbols,
            confirm: SymbolButton::new('\n', confirm),
            buffer: String::new(),
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Samples every button once.
    ///
    /// Returns the typed code when the confirm button has just been released,
    /// and clears the buffer for the next code.
    pub fn poll(&mut self) -> GpioResult<Option<String>> {
        let mut typed = None;
        for button in self.symbols.iter_mut() {
            if button.released()? && typed.is_none() {
                typed = Some(button.symbol);
            }
        }
        if let Some(symbol) = typed {
            trace!("Button {:?} released.", symbol);
            self.buffer.push(symbol);
        }

        if self.confirm.released()? {
            debug!("Code confirmed ({} symbols).", self.buffer.len());
            return Ok(Some(std::mem::take(&mut self.buffer)));
        }

        Ok(None)
    }

    /// Blocks until a complete code has been entered.
    pub fn read_code(&mut self) -> GpioResult<String> {
        loop {
            if let Some(code) = self.poll()? {
                return Ok(code);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl Debug for ButtonPanel<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ButtonPanel({:?}, confirm: {:?})", self.symbols, self.confirm.input)
    }
}
