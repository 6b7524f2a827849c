//! Shout-and-Shoot launcher controller library.
//!
//! Fires a clay-target launcher through a relay when the operator presses
//! the fire button or says the wake word. Exposes the control loop and its
//! port traits so the whole controller runs against mock hardware in tests;
//! the Raspberry Pi GPIO backend and the Porcupine engine sit behind the
//! `rpi` and `porcupine` features.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod listener;
pub mod pins;

pub use app::service::ControlLoop;
pub use app::state::{LoopStatus, RunState, ShutdownCause, ShutdownReport};
pub use config::ControllerConfig;
pub use error::{ConfigurationError, Error, HardwareFault, ListenerError, Result};
