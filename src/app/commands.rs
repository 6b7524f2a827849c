//! Inbound requests to the control loop.
//!
//! Produced by the button ports and the wake-word listeners each tick and
//! arbitrated by the [`ControlLoop`](super::service::ControlLoop).

use core::fmt;

/// Where a fire request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The manual fire button.
    Button,
    /// A wake-word detection from listener `source`.
    Voice { source: usize },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Button => f.write_str("button"),
            Self::Voice { source } => write!(f, "voice#{source}"),
        }
    }
}
