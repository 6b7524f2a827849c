//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port. The binary logs them; tests
//! collect them.

use crate::drivers::launcher::{IgnoreReason, Pulse};
use crate::error::{HardwareFault, ListenerError};

use super::commands::Trigger;
use super::state::{ShutdownCause, ShutdownReport};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Initialisation succeeded; the loop is running.
    Started { listeners: usize },

    /// A pulse started.
    Fired { trigger: Trigger },

    /// A fire request was dropped.
    FireIgnored {
        trigger: Trigger,
        reason: IgnoreReason,
    },

    /// The relay reopened.
    PulseComplete(Pulse),

    /// A listener's engine failed mid-run; voice firing from it is gone.
    ListenerLost {
        source: usize,
        name: String,
        error: Option<ListenerError>,
    },

    /// An indicator LED could not be driven. The loop keeps running.
    IndicatorFault(HardwareFault),

    /// Run state moved to shutting down.
    ShutdownRequested(ShutdownCause),

    /// Teardown finished; every line and listener has been released.
    Stopped(ShutdownReport),
}
