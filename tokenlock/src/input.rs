use tokenlock_gpio::buttons::ButtonPanel;
use tokenlock_gpio::GpioResult;

/// Where codes come from.
pub trait InputSource {
    /// Blocks until someone has entered and confirmed a code.
    fn read_code(&mut self) -> GpioResult<String>;
}

impl InputSource for ButtonPanel<'_> {
    fn read_code(&mut self) -> GpioResult<String> {
        ButtonPanel::read_code(self)
    }
}
