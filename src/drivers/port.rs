//! Digital I/O ports and line ownership.
//!
//! Each physical line is claimed once through the [`PinRegistry`] and then
//! owned by exactly one [`InputPort`] or [`OutputPort`] for the life of the
//! process. Ports hand their line back through [`release`], which is
//! idempotent and also runs on `Drop`, so every line opened during startup
//! is returned no matter which path ends the program.
//!
//! ## Fault handling
//!
//! Driver errors become [`HardwareFault`]s carrying the line and role. The
//! port never retries; the control loop decides what a fault means.
//!
//! [`release`]: OutputPort::release

use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::PinBank;
use crate::drivers::button::{ButtonState, Debouncer};
use crate::error::{ConfigurationError, HardwareFault};
use crate::pins::{Direction, PinRole};

fn fault(line: u8, role: PinRole, e: &impl embedded_hal::digital::Error) -> HardwareFault {
    HardwareFault {
        line,
        role,
        kind: e.kind(),
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Tracks which role owns which line.
#[derive(Debug, Default)]
pub struct PinRegistry {
    bound: Vec<(u8, PinRole)>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Role currently bound to `line`, if any.
    pub fn bound_role(&self, line: u8) -> Option<PinRole> {
        self.bound
            .iter()
            .find_map(|&(l, role)| (l == line).then_some(role))
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    fn claim(
        &mut self,
        line: u8,
        role: PinRole,
        requested: Direction,
    ) -> Result<(), ConfigurationError> {
        if role.direction() != requested {
            return Err(ConfigurationError::DirectionMismatch {
                line,
                role,
                requested,
            });
        }
        if let Some(bound_to) = self.bound_role(line) {
            return Err(ConfigurationError::LineAlreadyBound {
                line,
                role,
                bound_to,
            });
        }
        if self.bound.iter().any(|&(_, r)| r == role) {
            return Err(ConfigurationError::InvalidSetting {
                field: "pins",
                reason: format!("{role} assigned twice"),
            });
        }
        self.bound.push((line, role));
        Ok(())
    }

    fn unclaim(&mut self, line: u8) {
        self.bound.retain(|&(l, _)| l != line);
    }

    /// Bind `line` to an input role and open it as a debounced button.
    pub fn configure_input<B: PinBank>(
        &mut self,
        bank: &mut B,
        line: u8,
        role: PinRole,
        active_low: bool,
        debounce_window_ms: u32,
    ) -> Result<InputPort<B::Input>, ConfigurationError> {
        self.claim(line, role, Direction::Input)?;
        let pin = bank.open_input(line, role).inspect_err(|_| self.unclaim(line))?;
        debug!("GPIO {line} bound to {role}");
        Ok(InputPort {
            line,
            role,
            pin: Some(pin),
            active_low,
            debouncer: Debouncer::new(debounce_window_ms),
        })
    }

    /// Bind `line` to an output role. The line starts low.
    pub fn configure_output<B: PinBank>(
        &mut self,
        bank: &mut B,
        line: u8,
        role: PinRole,
    ) -> Result<OutputPort<B::Output>, ConfigurationError> {
        self.claim(line, role, Direction::Output)?;
        let pin = bank.open_output(line, role).inspect_err(|_| self.unclaim(line))?;
        debug!("GPIO {line} bound to {role}");
        Ok(OutputPort {
            line,
            role,
            pin: Some(pin),
            level: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Input port
// ---------------------------------------------------------------------------

/// A debounced button line.
pub struct InputPort<P: InputPin> {
    line: u8,
    role: PinRole,
    pin: Option<P>,
    active_low: bool,
    debouncer: Debouncer,
}

impl<P: InputPin> InputPort<P> {
    /// Sample the line. `Ok(true)` when a new press edge is reported.
    /// A released port never reports an edge.
    pub fn poll(&mut self, now_ms: u64) -> Result<bool, HardwareFault> {
        let Some(pin) = self.pin.as_mut() else {
            return Ok(false);
        };
        let read = if self.active_low {
            pin.is_low()
        } else {
            pin.is_high()
        };
        let active = read.map_err(|e| fault(self.line, self.role, &e))?;
        Ok(self.debouncer.update(active, now_ms))
    }

    pub fn line(&self) -> u8 {
        self.line
    }

    pub fn role(&self) -> PinRole {
        self.role
    }

    pub fn state(&self) -> ButtonState {
        self.debouncer.state()
    }

    pub fn is_released(&self) -> bool {
        self.pin.is_none()
    }

    /// Hand the line back. Returns `true` if this call did the release.
    pub fn release(&mut self) -> bool {
        match self.pin.take() {
            Some(pin) => {
                drop(pin);
                debug!("GPIO {} ({}) released", self.line, self.role);
                true
            }
            None => false,
        }
    }
}

impl<P: InputPin> Drop for InputPort<P> {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Output port
// ---------------------------------------------------------------------------

/// A driven line (LED or relay).
pub struct OutputPort<P: OutputPin> {
    line: u8,
    role: PinRole,
    pin: Option<P>,
    level: bool,
}

impl<P: OutputPin> OutputPort<P> {
    /// Drive the line. Writes to a released port are dropped.
    pub fn set(&mut self, level: bool) -> Result<(), HardwareFault> {
        let Some(pin) = self.pin.as_mut() else {
            debug!("write to released {} ignored", self.role);
            return Ok(());
        };
        let res = if level { pin.set_high() } else { pin.set_low() };
        res.map_err(|e| fault(self.line, self.role, &e))?;
        self.level = level;
        Ok(())
    }

    /// Last level successfully written.
    pub fn level(&self) -> bool {
        self.level
    }

    pub fn line(&self) -> u8 {
        self.line
    }

    pub fn role(&self) -> PinRole {
        self.role
    }

    pub fn is_released(&self) -> bool {
        self.pin.is_none()
    }

    /// Drive low and hand the line back. Returns `true` if this call did
    /// the release.
    pub fn release(&mut self) -> bool {
        match self.pin.take() {
            Some(mut pin) => {
                if let Err(e) = pin.set_low() {
                    warn!(
                        "GPIO {} ({}) could not be driven low on release: {:?}",
                        self.line,
                        self.role,
                        e.kind()
                    );
                }
                self.level = false;
                drop(pin);
                debug!("GPIO {} ({}) released", self.line, self.role);
                true
            }
            None => false,
        }
    }
}

impl<P: OutputPin> Drop for OutputPort<P> {
    fn drop(&mut self) {
        self.release();
    }
}
