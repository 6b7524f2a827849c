//! GPIO pin assignments and roles for the launcher controller board.
//!
//! Single source of truth for the default wiring. Every line number here
//! uses BCM numbering and can be overridden per deployment through
//! [`PinMap`](crate::config::PinMap) in the config file.
//!
//! ```text
//!   BCM 17 ──┤ shutdown button   (input, pull-up, active low)
//!   BCM 27 ──┤ manual fire button (input, pull-up, active low)
//!   BCM  5 ──┤ firing LED        (output)
//!   BCM  6 ──┤ listening LED     (output)
//!   BCM 13 ──┤ running LED       (output)
//!   BCM 26 ──┤ relay driver      (output, closes the launcher remote)
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------

/// Momentary push-button requesting a clean shutdown.
pub const SHUTDOWN_BUTTON_GPIO: u8 = 17;
/// Momentary push-button firing the launcher by hand.
pub const MANUAL_FIRE_BUTTON_GPIO: u8 = 27;

// ---------------------------------------------------------------------------
// Status LEDs
// ---------------------------------------------------------------------------

pub const LED_FIRING_GPIO: u8 = 5;
pub const LED_LISTENING_GPIO: u8 = 6;
pub const LED_RUNNING_GPIO: u8 = 13;

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Digital output to the relay driver transistor. HIGH closes the contact
/// wired across the launcher remote's trigger button.
pub const RELAY_GPIO: u8 = 26;

/// Which way a role drives its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// The job a physical line performs. Assigned once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinRole {
    ShutdownButton,
    ManualFireButton,
    FiringLed,
    ListeningLed,
    RunningLed,
    Relay,
}

impl PinRole {
    pub const ALL: [PinRole; 6] = [
        PinRole::ShutdownButton,
        PinRole::ManualFireButton,
        PinRole::FiringLed,
        PinRole::ListeningLed,
        PinRole::RunningLed,
        PinRole::Relay,
    ];

    pub const fn direction(self) -> Direction {
        match self {
            Self::ShutdownButton | Self::ManualFireButton => Direction::Input,
            Self::FiringLed | Self::ListeningLed | Self::RunningLed | Self::Relay => {
                Direction::Output
            }
        }
    }

    /// Faults on these lines leave the launcher in an unknown state.
    /// Indicator faults are cosmetic.
    pub const fn is_safety_relevant(self) -> bool {
        matches!(
            self,
            Self::ShutdownButton | Self::ManualFireButton | Self::Relay
        )
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ShutdownButton => "shutdown button",
            Self::ManualFireButton => "manual fire button",
            Self::FiringLed => "firing LED",
            Self::ListeningLed => "listening LED",
            Self::RunningLed => "running LED",
            Self::Relay => "relay",
        };
        f.write_str(name)
    }
}
