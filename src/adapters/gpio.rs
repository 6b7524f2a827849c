//! GPIO bank adapters.
//!
//! - **`feature = "rpi"`**: [`RppalBank`] opens BCM lines through `rppal`
//!   (`/dev/gpiomem`). Buttons get the internal pull-up or pull-down
//!   matching their polarity; outputs start low. `rppal` restores each
//!   line's original mode when the pin is dropped.
//! - **always**: [`SimulatedBank`] keeps line levels in memory so the
//!   controller can be exercised on a desktop and in unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::app::ports::PinBank;
use crate::error::ConfigurationError;
use crate::pins::PinRole;

// ---------------------------------------------------------------------------
// Simulated bank
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SimLines {
    levels: HashMap<u8, bool>,
    open: HashSet<u8>,
    reserved: HashSet<u8>,
}

/// In-memory GPIO bank. Clones share the same lines.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBank {
    lines: Rc<RefCell<SimLines>>,
}

impl SimulatedBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `line` as owned by something outside this process.
    pub fn reserve(&mut self, line: u8) {
        self.lines.borrow_mut().reserved.insert(line);
    }

    /// Set the level an input line reads back.
    pub fn drive(&self, line: u8, level: bool) {
        self.lines.borrow_mut().levels.insert(line, level);
    }

    /// Current level of a line (outputs: last written; inputs: last driven).
    pub fn level(&self, line: u8) -> bool {
        self.lines
            .borrow()
            .levels
            .get(&line)
            .copied()
            .unwrap_or(false)
    }

    pub fn is_open(&self, line: u8) -> bool {
        self.lines.borrow().open.contains(&line)
    }

    fn open(&mut self, line: u8, role: PinRole) -> Result<(), ConfigurationError> {
        let mut lines = self.lines.borrow_mut();
        if lines.reserved.contains(&line) || !lines.open.insert(line) {
            return Err(ConfigurationError::LineUnavailable {
                line,
                role,
                reason: "line busy".to_string(),
            });
        }
        Ok(())
    }
}

/// Line handle from [`SimulatedBank`]. Works as input or output.
#[derive(Debug)]
pub struct SimPin {
    line: u8,
    lines: Rc<RefCell<SimLines>>,
}

impl Drop for SimPin {
    fn drop(&mut self) {
        self.lines.borrow_mut().open.remove(&self.line);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self
            .lines
            .borrow()
            .levels
            .get(&self.line)
            .copied()
            .unwrap_or(false))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|h| !h)
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.lines.borrow_mut().levels.insert(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.lines.borrow_mut().levels.insert(self.line, true);
        Ok(())
    }
}

impl PinBank for SimulatedBank {
    type Input = SimPin;
    type Output = SimPin;

    fn open_input(&mut self, line: u8, role: PinRole) -> Result<SimPin, ConfigurationError> {
        self.open(line, role)?;
        Ok(SimPin {
            line,
            lines: Rc::clone(&self.lines),
        })
    }

    fn open_output(&mut self, line: u8, role: PinRole) -> Result<SimPin, ConfigurationError> {
        self.open(line, role)?;
        self.lines.borrow_mut().levels.insert(line, false);
        Ok(SimPin {
            line,
            lines: Rc::clone(&self.lines),
        })
    }
}

// ---------------------------------------------------------------------------
// Raspberry Pi bank
// ---------------------------------------------------------------------------

#[cfg(feature = "rpi")]
pub use rpi::RppalBank;

#[cfg(feature = "rpi")]
mod rpi {
    use rppal::gpio::{Gpio, InputPin, OutputPin};

    use crate::app::ports::PinBank;
    use crate::error::ConfigurationError;
    use crate::pins::PinRole;

    /// BCM GPIO lines via `rppal`.
    pub struct RppalBank {
        gpio: Gpio,
        buttons_active_low: bool,
    }

    impl RppalBank {
        pub fn new(buttons_active_low: bool) -> Result<Self, ConfigurationError> {
            let gpio = Gpio::new().map_err(|e| ConfigurationError::LineUnavailable {
                line: 0,
                role: PinRole::RunningLed,
                reason: format!("GPIO controller: {e}"),
            })?;
            Ok(Self {
                gpio,
                buttons_active_low,
            })
        }

        fn get(&self, line: u8, role: PinRole) -> Result<rppal::gpio::Pin, ConfigurationError> {
            self.gpio
                .get(line)
                .map_err(|e| ConfigurationError::LineUnavailable {
                    line,
                    role,
                    reason: e.to_string(),
                })
        }
    }

    impl PinBank for RppalBank {
        type Input = InputPin;
        type Output = OutputPin;

        fn open_input(&mut self, line: u8, role: PinRole) -> Result<InputPin, ConfigurationError> {
            let pin = self.get(line, role)?;
            Ok(if self.buttons_active_low {
                pin.into_input_pullup()
            } else {
                pin.into_input_pulldown()
            })
        }

        fn open_output(
            &mut self,
            line: u8,
            role: PinRole,
        ) -> Result<OutputPin, ConfigurationError> {
            Ok(self.get(line, role)?.into_output_low())
        }
    }
}
