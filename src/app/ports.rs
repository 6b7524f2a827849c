//! Port traits: the boundary between the control loop and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! GPIO backends, the wake-word engine, the clock and the event log all
//! implement these traits. The [`ControlLoop`](super::service::ControlLoop)
//! consumes them via generics, so the coordinator never touches hardware or
//! audio directly and runs unchanged against the mocks in `tests/`.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::{ConfigurationError, ListenerError};
use crate::pins::PinRole;

// ───────────────────────────────────────────────────────────────
// GPIO bank (driven adapter: domain → lines)
// ───────────────────────────────────────────────────────────────

/// Opens physical lines. The bank does not track ownership; that is the
/// [`PinRegistry`](crate::drivers::port::PinRegistry)'s job.
///
/// Dropping a returned pin hands the line back to the backend.
pub trait PinBank {
    type Input: InputPin;
    type Output: OutputPin;

    /// Open `line` as an input with the bias appropriate for `role`.
    fn open_input(&mut self, line: u8, role: PinRole) -> Result<Self::Input, ConfigurationError>;

    /// Open `line` as an output, initially low.
    fn open_output(&mut self, line: u8, role: PinRole)
    -> Result<Self::Output, ConfigurationError>;
}

// ───────────────────────────────────────────────────────────────
// Wake-word engine (driven adapter: audio → domain)
// ───────────────────────────────────────────────────────────────

/// One keyword-spotting engine bound to one audio input.
///
/// Implementations block on the audio device inside [`next_window`]. A
/// spotter is built, driven and closed on its own listener thread, so it
/// need not be `Send`; vendor engine handles usually are not.
///
/// [`next_window`]: KeywordSpotter::next_window
pub trait KeywordSpotter {
    /// Human-readable source name, e.g. the capture device.
    fn name(&self) -> &str;

    /// Wait for the next audio window and report whether the keyword was
    /// recognised in it. An error means the engine is gone for good.
    fn next_window(&mut self) -> Result<bool, ListenerError>;

    /// Release the engine and audio device. Called exactly once.
    fn close(&mut self) {}
}

impl<S: KeywordSpotter + ?Sized> KeywordSpotter for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_window(&mut self) -> Result<bool, ListenerError> {
        (**self).next_window()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic time source in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The control loop emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
