//! Launch actuator: relay pulse driver for the clay-target launcher.
//!
//! The relay contact is wired across the trigger button of the launcher's
//! remote control. One closure of `pulse_duration_ms` throws one target.
//!
//! ## Safety contract
//!
//! At most one pulse is in flight. [`fire`] while a pulse is running is a
//! no-op: never queued, never extending or restarting the pulse. The pulse
//! is ended by [`tick`], so the caller keeps servicing buttons while the
//! relay is closed.
//!
//! [`fire`]: LaunchActuator::fire
//! [`tick`]: LaunchActuator::tick

use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::app::state::RunState;
use crate::config::TimingConfig;
use crate::drivers::port::OutputPort;
use crate::error::HardwareFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringState {
    Ready,
    Firing { since_ms: u64 },
}

/// Why a fire request did not start a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A pulse is already in flight.
    InProgress,
    /// The previous pulse started less than `rearm_delay_ms` ago.
    Rearming,
    /// Shutdown has been requested.
    ShuttingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Started,
    Ignored(IgnoreReason),
}

/// A completed pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub started_ms: u64,
    pub ended_ms: u64,
}

pub struct LaunchActuator<P: OutputPin> {
    relay: OutputPort<P>,
    state: FiringState,
    pulse_ms: u64,
    rearm_ms: u64,
    last_start_ms: Option<u64>,
    pulses: u32,
}

impl<P: OutputPin> LaunchActuator<P> {
    pub fn new(relay: OutputPort<P>, timing: &TimingConfig) -> Self {
        Self {
            relay,
            state: FiringState::Ready,
            pulse_ms: timing.pulse_duration_ms as u64,
            rearm_ms: timing.rearm_delay_ms as u64,
            last_start_ms: None,
            pulses: 0,
        }
    }

    /// Close the relay if the launcher is ready and the controller running.
    pub fn fire(&mut self, now_ms: u64, run: RunState) -> Result<FireOutcome, HardwareFault> {
        if run != RunState::Running {
            return Ok(FireOutcome::Ignored(IgnoreReason::ShuttingDown));
        }
        if let FiringState::Firing { .. } = self.state {
            return Ok(FireOutcome::Ignored(IgnoreReason::InProgress));
        }
        if let Some(last) = self.last_start_ms {
            if now_ms.saturating_sub(last) < self.rearm_ms {
                return Ok(FireOutcome::Ignored(IgnoreReason::Rearming));
            }
        }

        if let Err(fault) = self.relay.set(true) {
            if let Err(reopen) = self.relay.set(false) {
                warn!("relay could not be driven open after a failed close: {reopen}");
            }
            error!("relay failed to close: {fault}");
            return Err(fault);
        }
        self.state = FiringState::Firing { since_ms: now_ms };
        self.last_start_ms = Some(now_ms);
        self.pulses = self.pulses.wrapping_add(1);
        info!("Relay closed (pulse #{}, {} ms)", self.pulses, self.pulse_ms);
        Ok(FireOutcome::Started)
    }

    /// Advance the pulse timer. Returns the pulse once the relay reopens.
    pub fn tick(&mut self, now_ms: u64) -> Result<Option<Pulse>, HardwareFault> {
        let FiringState::Firing { since_ms } = self.state else {
            return Ok(None);
        };
        if now_ms.saturating_sub(since_ms) < self.pulse_ms {
            return Ok(None);
        }
        // The pulse is over either way; a failed open is the caller's fault
        // to escalate and release() retries the low level.
        self.state = FiringState::Ready;
        self.relay.set(false)?;
        Ok(Some(Pulse {
            started_ms: since_ms,
            ended_ms: now_ms,
        }))
    }

    pub fn state(&self) -> FiringState {
        self.state
    }

    pub fn is_firing(&self) -> bool {
        matches!(self.state, FiringState::Firing { .. })
    }

    /// Pulses started since construction.
    pub fn pulses_fired(&self) -> u32 {
        self.pulses
    }

    pub fn relay_level(&self) -> bool {
        self.relay.level()
    }

    /// Open the relay and hand the line back. Idempotent.
    pub fn release(&mut self) -> bool {
        self.state = FiringState::Ready;
        self.relay.release()
    }
}
