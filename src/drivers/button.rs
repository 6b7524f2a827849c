//! Sampled button debouncer.
//!
//! ## Hardware
//!
//! Momentary switch to ground with a pull-up (active low by default). The
//! control loop samples the line every poll interval and feeds the level
//! into [`Debouncer::update`], which runs the press state machine.
//!
//! ## States
//!
//! | State        | Meaning                                         |
//! |--------------|-------------------------------------------------|
//! | `Idle`       | Waiting for an inactive → active transition     |
//! | `Pressed`    | Edge reported on the previous sample            |
//! | `Debouncing` | Refractory window; transitions are ignored      |
//!
//! The window starts on a reported press and restarts on every release, so
//! contacts chattering as a long-held button is let go never count as a new
//! press. A press is only reported once the line has been released for a
//! full window.
//!
//! The very first sample only seeds the level, so a button held while the
//! controller boots never produces a press.

/// Press-detection state, owned by one input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Pressed { since_ms: u64 },
    Debouncing { since_ms: u64 },
}

pub struct Debouncer {
    state: ButtonState,
    window_ms: u64,
    last_active: Option<bool>,
}

impl Debouncer {
    pub fn new(window_ms: u32) -> Self {
        Self {
            state: ButtonState::Idle,
            window_ms: window_ms as u64,
            last_active: None,
        }
    }

    /// Feed one sample. Returns `true` exactly when a new press is reported.
    pub fn update(&mut self, active: bool, now_ms: u64) -> bool {
        let rising = matches!(self.last_active, Some(false)) && active;
        let falling = matches!(self.last_active, Some(true)) && !active;
        self.last_active = Some(active);

        if let ButtonState::Pressed { since_ms } = self.state {
            self.state = ButtonState::Debouncing { since_ms };
        }
        if falling {
            self.state = ButtonState::Debouncing { since_ms: now_ms };
        }
        if let ButtonState::Debouncing { since_ms } = self.state {
            if now_ms.saturating_sub(since_ms) >= self.window_ms {
                self.state = ButtonState::Idle;
            }
        }

        if rising && self.state == ButtonState::Idle {
            self.state = ButtonState::Pressed { since_ms: now_ms };
            return true;
        }
        false
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }
}
