//! Application core: the control loop and its boundaries.
//!
//! All interaction with GPIO, audio and logging happens through the
//! **port traits** in [`ports`], keeping the coordinator testable without
//! real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod state;
