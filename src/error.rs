//! Unified error types for the launcher controller.
//!
//! A single [`Error`] enum that every subsystem converts into, so startup in
//! `main` has one failure path. Runtime faults are handled inside the control
//! loop and only surface here when they abort initialisation.

use std::path::PathBuf;

use embedded_hal::digital::ErrorKind;
use thiserror::Error;

use crate::pins::{Direction, PinRole};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Error {
    /// Pin map or settings rejected during initialisation.
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    /// A line driver failed.
    #[error("hardware: {0}")]
    Hardware(#[from] HardwareFault),
    /// The wake-word engine could not be started.
    #[error("listener startup: {0}")]
    ListenerStartup(#[from] ListenerError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("GPIO {line} requested for {role} is already bound to {bound_to}")]
    LineAlreadyBound {
        line: u8,
        role: PinRole,
        bound_to: PinRole,
    },
    #[error("{role} cannot be opened as {requested:?} on GPIO {line}")]
    DirectionMismatch {
        line: u8,
        role: PinRole,
        requested: Direction,
    },
    #[error("GPIO {line} for {role} is unavailable: {reason}")]
    LineUnavailable {
        line: u8,
        role: PinRole,
        reason: String,
    },
    #[error("invalid setting `{field}`: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
    #[error("cannot load {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
}

// ---------------------------------------------------------------------------
// Hardware faults
// ---------------------------------------------------------------------------

/// A driver-level failure on one line. Not retried by the port; the control
/// loop decides whether to degrade or shut down based on the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{role} (GPIO {line}) fault: {kind:?}")]
pub struct HardwareFault {
    pub line: u8,
    pub role: PinRole,
    pub kind: ErrorKind,
}

impl HardwareFault {
    pub fn is_safety_relevant(&self) -> bool {
        self.role.is_safety_relevant()
    }
}

// ---------------------------------------------------------------------------
// Listener errors
// ---------------------------------------------------------------------------

/// Failures of the wake-word engine. Fatal during startup, a
/// `ListenerLost` degradation afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    #[error("access key rejected: {0}")]
    Credentials(String),
    #[error("keyword or model file: {0}")]
    Model(String),
    #[error("audio device: {0}")]
    AudioDevice(String),
    #[error("no usable audio input device")]
    NoInputDevices,
    #[error("engine: {0}")]
    Engine(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
