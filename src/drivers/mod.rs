//! Line-level drivers: ports, button debouncing, relay and indicators.

pub mod button;
pub mod launcher;
pub mod port;
pub mod status_led;
