//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements | Connects to                         |
//! |------------|------------|-------------------------------------|
//! | `gpio`     | PinBank    | rppal (`rpi`) or an in-memory bank  |
//! | `log_sink` | EventSink  | `log` facade                        |
//! | `time`     | Clock      | `std::time::Instant`                |
//!
//! The wake-word spotter adapter lives in
//! [`listener::porcupine`](crate::listener) with the listener plumbing.

pub mod gpio;
pub mod log_sink;
pub mod time;
