//! Status indicator LEDs.
//!
//! Three discrete LEDs: running (controller alive), listening (at least one
//! wake-word listener alive) and firing (relay closed). Purely reflective;
//! the control loop decides what they show.

use embedded_hal::digital::OutputPin;

use crate::drivers::port::OutputPort;
use crate::error::HardwareFault;

/// Snapshot of the three indicator levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorLevels {
    pub running: bool,
    pub listening: bool,
    pub firing: bool,
}

pub struct StatusIndicators<P: OutputPin> {
    running: OutputPort<P>,
    listening: OutputPort<P>,
    firing: OutputPort<P>,
}

impl<P: OutputPin> StatusIndicators<P> {
    pub fn new(running: OutputPort<P>, listening: OutputPort<P>, firing: OutputPort<P>) -> Self {
        Self {
            running,
            listening,
            firing,
        }
    }

    pub fn set_running(&mut self, on: bool) -> Result<(), HardwareFault> {
        self.running.set(on)
    }

    pub fn set_listening(&mut self, on: bool) -> Result<(), HardwareFault> {
        self.listening.set(on)
    }

    pub fn set_firing(&mut self, on: bool) -> Result<(), HardwareFault> {
        self.firing.set(on)
    }

    /// Drive every LED low. Attempts all three; reports the first fault.
    pub fn all_off(&mut self) -> Result<(), HardwareFault> {
        let results = [
            self.firing.set(false),
            self.listening.set(false),
            self.running.set(false),
        ];
        results.into_iter().collect()
    }

    pub fn levels(&self) -> IndicatorLevels {
        IndicatorLevels {
            running: self.running.level(),
            listening: self.listening.level(),
            firing: self.firing.level(),
        }
    }

    /// Release all three lines. Returns how many this call released.
    pub fn release(&mut self) -> usize {
        [
            self.firing.release(),
            self.listening.release(),
            self.running.release(),
        ]
        .into_iter()
        .filter(|&released| released)
        .count()
    }
}
