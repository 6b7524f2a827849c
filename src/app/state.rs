//! Run state of the control loop.

use crate::error::HardwareFault;

/// Whether new fire requests are accepted. Monotonic: once
/// `ShuttingDown`, never `Running` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    ShuttingDown,
}

/// What ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The operator pressed the shutdown button.
    Button,
    /// A relay or button line failed; the launcher can no longer be
    /// controlled safely.
    HardwareFault(HardwareFault),
}

impl ShutdownCause {
    /// Only an operator request hands over to the OS power-off.
    pub fn requests_power_off(&self) -> bool {
        matches!(self, Self::Button)
    }
}

/// Summary returned once teardown has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub cause: ShutdownCause,
    pub pulses_fired: u32,
    /// Lines handed back by this teardown.
    pub ports_released: usize,
    /// Listeners stopped by this teardown (already-lost ones included).
    pub listeners_closed: usize,
}

/// Result of one control-loop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Continue,
    Finished(ShutdownReport),
}
